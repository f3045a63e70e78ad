use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

/// Name of the logger at the top of every hierarchy.
pub const ROOT_LOGGER_NAME: &str = "root";

/// Numeric severity threshold. Higher is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u32);

impl Level {
    pub const NOTSET: Level = Level(0);
    pub const DEBUG: Level = Level(10);
    pub const INFO: Level = Level(20);
    pub const WARNING: Level = Level(30);
    pub const ERROR: Level = Level(40);
    pub const CRITICAL: Level = Level(50);

    pub fn new(value: u32) -> Self {
        Level(value)
    }

    pub fn is_set(self) -> bool {
        self != Level::NOTSET
    }

    /// Parses a level name, accepting the `FATAL` and `WARN` aliases. Case-sensitive.
    pub fn from_name(name: &str) -> Option<Level> {
        match name {
            "CRITICAL" | "FATAL" => Some(Level::CRITICAL),
            "ERROR" => Some(Level::ERROR),
            "WARNING" | "WARN" => Some(Level::WARNING),
            "INFO" => Some(Level::INFO),
            "DEBUG" => Some(Level::DEBUG),
            "NOTSET" => Some(Level::NOTSET),
            _ => None,
        }
    }

    pub fn name(self) -> Cow<'static, str> {
        match self {
            Level::CRITICAL => Cow::Borrowed("CRITICAL"),
            Level::ERROR => Cow::Borrowed("ERROR"),
            Level::WARNING => Cow::Borrowed("WARNING"),
            Level::INFO => Cow::Borrowed("INFO"),
            Level::DEBUG => Cow::Borrowed("DEBUG"),
            Level::NOTSET => Cow::Borrowed("NOTSET"),
            Level(n) => Cow::Owned(format!("Level {}", n)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// A rendering rule. Opaque to the reporter apart from its repr and identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Formatter {
    pub format: Option<String>,
    pub datefmt: Option<String>,
    pub style: char,
    /// Dotted class or factory path for custom formatters.
    pub class: Option<String>,
}

impl Formatter {
    pub fn new(format: Option<String>) -> Self {
        Formatter {
            format,
            datefmt: None,
            style: '%',
            class: None,
        }
    }

    pub fn type_name(&self) -> &str {
        self.class
            .as_deref()
            .map(last_segment)
            .unwrap_or("Formatter")
    }
}

impl fmt::Display for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_name())?;
        match &self.format {
            Some(s) => write!(f, "format='{}'", s)?,
            None => write!(f, "format=none")?,
        }
        if let Some(d) = &self.datefmt {
            write!(f, ", datefmt='{}'", d)?;
        }
        if self.style != '%' {
            write!(f, ", style='{}'", self.style)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Passes records from the named logger and its descendants.
    Name(String),
    Custom {
        factory: String,
        params: BTreeMap<String, Value>,
    },
}

/// An inclusion/exclusion predicate attached to a logger or handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub id: String,
    pub kind: FilterKind,
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FilterKind::Name(name) => write!(f, "Filter '{}': name='{}'", self.id, name),
            FilterKind::Custom { factory, params } => {
                write!(f, "{} '{}'", last_segment(factory), self.id)?;
                if !params.is_empty() {
                    let kv: Vec<String> =
                        params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                    write!(f, ": {}", kv.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    Stdout,
    Stderr,
    /// Anything that is not one of the process streams, kept verbatim.
    External(String),
}

impl fmt::Display for StreamTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamTarget::Stdout => write!(f, "<stdout>"),
            StreamTarget::Stderr => write!(f, "<stderr>"),
            StreamTarget::External(s) => write!(f, "<{}>", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rotation {
    None,
    Size { max_bytes: u64, backup_count: u32 },
    Timed {
        when: String,
        interval: u32,
        backup_count: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileTarget {
    pub path: PathBuf,
    pub mode: String,
    pub encoding: Option<String>,
    pub delay: bool,
    pub rotation: Rotation,
}

/// The asynchronous side of a queue handler: owns the handlers records are
/// actually delivered to.
#[derive(Debug, Clone, Default)]
pub struct QueueListener {
    pub handlers: Vec<Arc<Handler>>,
    pub respect_handler_level: bool,
    pub started: bool,
}

#[derive(Debug, Clone)]
pub struct QueueRelay {
    pub queue: String,
    pub listener: Option<QueueListener>,
}

#[derive(Debug, Clone)]
pub enum HandlerKind {
    Stream(StreamTarget),
    File(FileTarget),
    Queue(QueueRelay),
    Other { type_name: String },
}

/// A configured output target.
///
/// Built once by the loader and then only read. Formatters, filters and
/// handlers are shared through `Arc`, so two references to one configured
/// object keep one identity for the formatter registry to key on.
#[derive(Debug, Clone)]
pub struct Handler {
    /// Configuration id, when the handler came from a document.
    pub name: Option<String>,
    pub level: Level,
    pub formatter: Option<Arc<Formatter>>,
    pub filters: Vec<Arc<Filter>>,
    pub kind: HandlerKind,
}

impl Handler {
    pub fn new(kind: HandlerKind) -> Self {
        Handler {
            name: None,
            level: Level::NOTSET,
            formatter: None,
            filters: Vec::new(),
            kind,
        }
    }

    pub fn type_name(&self) -> &str {
        match &self.kind {
            HandlerKind::Stream(_) => "StreamHandler",
            HandlerKind::File(t) => match t.rotation {
                Rotation::None => "FileHandler",
                Rotation::Size { .. } => "RotatingFileHandler",
                Rotation::Timed { .. } => "TimedRotatingFileHandler",
            },
            HandlerKind::Queue(_) => "QueueHandler",
            HandlerKind::Other { type_name } => type_name,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Logger {
    pub name: String,
    pub level: Level,
    pub propagate: bool,
    pub disabled: bool,
    pub handlers: Vec<Arc<Handler>>,
    pub filters: Vec<Arc<Filter>>,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Logger {
            name: name.into(),
            level: Level::NOTSET,
            propagate: true,
            disabled: false,
            handlers: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.name == ROOT_LOGGER_NAME
    }

    /// Distinct formatters of this logger's handlers, in first-seen order.
    pub fn formatters(&self) -> Vec<Arc<Formatter>> {
        let mut out: Vec<Arc<Formatter>> = Vec::new();
        for fmt in self.handlers.iter().filter_map(|h| h.formatter.as_ref()) {
            if !out.iter().any(|seen| Arc::ptr_eq(seen, fmt)) {
                out.push(Arc::clone(fmt));
            }
        }
        out
    }
}

/// The logger hierarchy, keyed by dotted name.
///
/// Only the ownership direction parent → children is real; a logger's parent
/// is found by name as the nearest existing ancestor, so intermediate names
/// that were never configured are skipped.
#[derive(Debug, Clone)]
pub struct LoggerTree {
    loggers: BTreeMap<String, Logger>,
}

impl Default for LoggerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerTree {
    pub fn new() -> Self {
        let mut root = Logger::new(ROOT_LOGGER_NAME);
        root.level = Level::WARNING;
        let mut loggers = BTreeMap::new();
        loggers.insert(ROOT_LOGGER_NAME.to_string(), root);
        LoggerTree { loggers }
    }

    pub fn root(&self) -> &Logger {
        &self.loggers[ROOT_LOGGER_NAME]
    }

    pub fn root_mut(&mut self) -> &mut Logger {
        self.get_or_create(ROOT_LOGGER_NAME)
    }

    pub fn get(&self, name: &str) -> Option<&Logger> {
        self.loggers.get(name)
    }

    pub fn get_or_create(&mut self, name: &str) -> &mut Logger {
        self.loggers
            .entry(name.to_string())
            .or_insert_with(|| Logger::new(name))
    }

    pub fn loggers(&self) -> impl Iterator<Item = &Logger> {
        self.loggers.values()
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }

    pub fn parent_name(&self, name: &str) -> Option<&str> {
        if name == ROOT_LOGGER_NAME {
            return None;
        }
        let mut prefix = name;
        while let Some(idx) = prefix.rfind('.') {
            prefix = &prefix[..idx];
            if let Some((key, _)) = self.loggers.get_key_value(prefix) {
                return Some(key.as_str());
            }
        }
        Some(ROOT_LOGGER_NAME)
    }

    pub fn parent(&self, logger: &Logger) -> Option<&Logger> {
        self.parent_name(&logger.name).and_then(|p| self.get(p))
    }

    /// Direct children, ordered by name.
    pub fn children(&self, logger: &Logger) -> Vec<&Logger> {
        self.loggers
            .values()
            .filter(|l| self.parent_name(&l.name) == Some(logger.name.as_str()))
            .collect()
    }

    /// Own level if set, otherwise the nearest ancestor's.
    pub fn effective_level(&self, logger: &Logger) -> Level {
        let mut current = Some(logger);
        while let Some(l) = current {
            if l.level.is_set() {
                return l.level;
            }
            current = self.parent(l);
        }
        Level::NOTSET
    }
}

/// A borrowed view of any live object, for entry points that must check what
/// kind of object they were handed.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Logger(&'a Logger),
    Handler(&'a Handler),
    Formatter(&'a Formatter),
    Filter(&'a Filter),
}

impl<'a> Node<'a> {
    /// Kind plus a short identity, for error messages.
    pub fn label(&self) -> String {
        match self {
            Node::Logger(l) => format!("logger '{}'", l.name),
            Node::Handler(h) => format!("handler {}", h.type_name()),
            Node::Formatter(f) => format!("formatter {}", f),
            Node::Filter(f) => format!("filter '{}'", f.id),
        }
    }
}

pub(crate) fn last_segment(dotted: &str) -> &str {
    dotted.rsplit('.').next().unwrap_or(dotted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with(names: &[&str]) -> LoggerTree {
        let mut tree = LoggerTree::new();
        for n in names {
            tree.get_or_create(n);
        }
        tree
    }

    #[test]
    fn test_level_names_and_aliases() {
        assert_eq!(Level::from_name("WARN"), Some(Level::WARNING));
        assert_eq!(Level::from_name("FATAL"), Some(Level::CRITICAL));
        assert_eq!(Level::from_name("info"), None, "names are case-sensitive");
        assert_eq!(Level::new(15).to_string(), "Level 15");
        assert_eq!(Level::DEBUG.to_string(), "DEBUG");
    }

    #[test]
    fn test_parent_skips_unconfigured_intermediate_names() {
        let tree = tree_with(&["app", "app.db.pool"]);
        assert_eq!(tree.parent_name("app.db.pool"), Some("app"));
        assert_eq!(tree.parent_name("app"), Some(ROOT_LOGGER_NAME));
        assert_eq!(tree.parent_name(ROOT_LOGGER_NAME), None);
    }

    #[test]
    fn test_children_are_direct_only_and_sorted() {
        let tree = tree_with(&["b", "a", "a.x", "a.y.z"]);
        let root_children: Vec<&str> = tree
            .children(tree.root())
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(root_children, vec!["a", "b"]);

        let a = tree.get("a").unwrap();
        let a_children: Vec<&str> = tree.children(a).iter().map(|l| l.name.as_str()).collect();
        assert_eq!(a_children, vec!["a.x", "a.y.z"]);
    }

    #[test]
    fn test_effective_level_inherits_from_nearest_set_ancestor() {
        let mut tree = tree_with(&["app", "app.db"]);
        tree.root_mut().level = Level::ERROR;
        tree.get_or_create("app").level = Level::DEBUG;

        let db = tree.get("app.db").unwrap();
        assert_eq!(db.level, Level::NOTSET);
        assert_eq!(tree.effective_level(db), Level::DEBUG);

        tree.get_or_create("app").level = Level::NOTSET;
        let db = tree.get("app.db").unwrap();
        assert_eq!(tree.effective_level(db), Level::ERROR);
    }

    #[test]
    fn test_logger_formatters_are_deduplicated_by_identity() {
        let shared = Arc::new(Formatter::new(Some("%(message)s".into())));
        let twin = Arc::new(Formatter::new(Some("%(message)s".into())));
        let mk = |f: &Arc<Formatter>| {
            let mut h = Handler::new(HandlerKind::Stream(StreamTarget::Stdout));
            h.formatter = Some(Arc::clone(f));
            Arc::new(h)
        };
        let mut logger = Logger::new("app");
        logger.handlers = vec![mk(&shared), mk(&shared), mk(&twin)];
        assert_eq!(
            logger.formatters().len(),
            2,
            "equal-looking formatters are distinct objects; shared ones count once"
        );
    }

    #[test]
    fn test_handler_type_names_follow_file_rotation() {
        let file = |rotation| {
            Handler::new(HandlerKind::File(FileTarget {
                path: PathBuf::from("app.log"),
                mode: "a".into(),
                encoding: None,
                delay: false,
                rotation,
            }))
        };
        assert_eq!(file(Rotation::None).type_name(), "FileHandler");
        assert_eq!(
            file(Rotation::Size {
                max_bytes: 10,
                backup_count: 1
            })
            .type_name(),
            "RotatingFileHandler"
        );
        assert_eq!(
            Handler::new(HandlerKind::Other {
                type_name: "NullHandler".into()
            })
            .type_name(),
            "NullHandler"
        );
    }

    #[test]
    fn test_formatter_display_uses_custom_class_name() {
        let mut f = Formatter::new(Some("%(message)s".into()));
        f.class = Some("mypkg.fmt.JsonFormatter".into());
        f.datefmt = Some("%H:%M".into());
        assert_eq!(
            f.to_string(),
            "JsonFormatter(format='%(message)s', datefmt='%H:%M')"
        );
    }
}
