use crate::config::{self, default_config_root, ConfigSource};
use crate::defaults::DEFAULT_LOGGER_NAME;
use crate::error::{Error, Result};
use crate::model::{Handler, HandlerKind, Logger, LoggerTree, Node, Rotation};
use crate::registry::FormatterRegistry;
use crate::util::{bool_label, pad, to_json_indented};

use tracing::{debug, error, trace, warn};

use std::collections::BTreeSet;
use std::path::PathBuf;

/// How many queue listeners may be nested inside one another before the
/// walk gives up.
pub const MAX_LISTENER_DEPTH: usize = 4;

/// One node or a sequence of nodes, as accepted by
/// [`Reporter::describe_handlers`].
#[derive(Debug, Clone)]
pub enum Selection<'a> {
    One(Node<'a>),
    Many(Vec<Node<'a>>),
}

impl<'a> Selection<'a> {
    fn into_nodes(self) -> Vec<Node<'a>> {
        match self {
            Selection::One(n) => vec![n],
            Selection::Many(v) => v,
        }
    }
}

impl<'a> From<Node<'a>> for Selection<'a> {
    fn from(n: Node<'a>) -> Self {
        Selection::One(n)
    }
}

impl<'a> From<Vec<Node<'a>>> for Selection<'a> {
    fn from(v: Vec<Node<'a>>) -> Self {
        Selection::Many(v)
    }
}

impl<'a> From<&'a Handler> for Selection<'a> {
    fn from(h: &'a Handler) -> Self {
        Selection::One(Node::Handler(h))
    }
}

impl<'a> From<&'a [std::sync::Arc<Handler>]> for Selection<'a> {
    fn from(hs: &'a [std::sync::Arc<Handler>]) -> Self {
        Selection::Many(hs.iter().map(|h| Node::Handler(h)).collect())
    }
}

fn expect_logger<'n>(operation: &'static str, node: Node<'n>) -> Result<&'n Logger> {
    match node {
        Node::Logger(l) => Ok(l),
        other => Err(Error::TypeMismatch {
            operation,
            expected: "logger",
            found: other.label(),
        }),
    }
}

fn expect_handler<'n>(operation: &'static str, node: Node<'n>) -> Result<&'n Handler> {
    match node {
        Node::Handler(h) => Ok(h),
        other => Err(Error::TypeMismatch {
            operation,
            expected: "handler",
            found: other.label(),
        }),
    }
}

/// Renders loggers and handlers of one hierarchy as indented text.
///
/// Every describe operation returns its text; only [`show_logging_setup`]
/// prints. Depth is two spaces per level, and each line is also emitted at
/// `trace` level while the walk runs.
#[derive(Debug, Clone, Copy)]
pub struct Reporter<'a> {
    tree: &'a LoggerTree,
    registry: &'a FormatterRegistry,
}

impl<'a> Reporter<'a> {
    pub fn new(tree: &'a LoggerTree, registry: &'a FormatterRegistry) -> Self {
        Reporter { tree, registry }
    }

    pub fn tree(&self) -> &'a LoggerTree {
        self.tree
    }

    pub fn registry(&self) -> &'a FormatterRegistry {
        self.registry
    }

    /// Describes a single handler at `indent`. For a queue handler with
    /// `show_all`, the listener's handlers follow one level deeper.
    ///
    /// # Errors
    /// - `Error::TypeMismatch` if `node` is not a handler.
    /// - `Error::DepthExceeded` if queue listeners nest deeper than
    ///   [`MAX_LISTENER_DEPTH`].
    pub fn describe_handler(
        &self,
        node: Node<'_>,
        indent: usize,
        show_all: bool,
    ) -> Result<String> {
        let handler = expect_handler("describe_handler", node)?;
        let mut lines = Vec::new();
        self.handler_lines(handler, indent, show_all, 0, &mut lines)
            .map_err(|e| {
                error!(error=%e, handler=handler.type_name(), "describe_handler failed");
                e
            })?;
        Ok(lines.join("\n"))
    }

    /// Describes one handler or a sequence of handlers, each one level deeper
    /// than `indent`. Every element is checked before anything is rendered.
    pub fn describe_handlers<'n>(
        &self,
        selection: impl Into<Selection<'n>>,
        indent: usize,
        show_all: bool,
    ) -> Result<String> {
        let nodes = selection.into().into_nodes();
        let handlers = nodes
            .into_iter()
            .map(|n| expect_handler("describe_handlers", n))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| {
                error!(error=%e, "describe_handlers: rejected input");
                e
            })?;

        let mut lines = Vec::new();
        for handler in handlers {
            self.handler_lines(handler, indent + 1, show_all, 0, &mut lines)
                .map_err(|e| {
                    error!(error=%e, handler=handler.type_name(), "describe_handlers failed");
                    e
                })?;
        }
        Ok(lines.join("\n"))
    }

    /// Describes a logger: one summary line, and with `show_all` its
    /// handlers, formatters, filters and (recursively) its children.
    ///
    /// # Errors
    /// - `Error::TypeMismatch` if `node` is not a logger.
    /// - Anything a nested handler description fails with.
    pub fn describe_logger(
        &self,
        node: Node<'_>,
        indent: usize,
        show_all: bool,
    ) -> Result<String> {
        let logger = expect_logger("describe_logger", node)?;
        let mut lines = Vec::new();
        let mut visited = BTreeSet::new();
        self.logger_lines(logger, indent, false, show_all, &mut visited, &mut lines)
            .map_err(|e| {
                error!(error=%e, logger=%logger.name, "describe_logger failed");
                e
            })?;
        Ok(lines.join("\n"))
    }

    fn logger_lines(
        &self,
        logger: &Logger,
        depth: usize,
        as_child: bool,
        show_all: bool,
        visited: &mut BTreeSet<String>,
        out: &mut Vec<String>,
    ) -> Result<()> {
        if !visited.insert(logger.name.clone()) {
            warn!(logger=%logger.name, "logger reached twice; not descending again");
            return Ok(());
        }

        let children = self.tree.children(logger);
        let formatters = logger.formatters();
        let parent = self.tree.parent_name(&logger.name).unwrap_or("none");

        let mut line = format!(
            "{}{}{}: Level={}, Propagate={}, Handlers({}), Formatters({}), Filters({}), Children({}), Parent={}",
            pad(depth),
            if as_child { "child: " } else { "" },
            logger.name,
            self.tree.effective_level(logger),
            bool_label(logger.propagate),
            logger.handlers.len(),
            formatters.len(),
            logger.filters.len(),
            children.len(),
            parent,
        );
        if logger.disabled {
            line.push_str(", Disabled");
        }
        trace!(%line);
        out.push(line);

        if !show_all {
            return Ok(());
        }

        let sub = depth + 1;
        if !logger.handlers.is_empty() {
            out.push(format!("{}Handlers:", pad(sub)));
            for handler in &logger.handlers {
                self.handler_lines(handler, sub + 1, show_all, 0, out)?;
            }
        }
        if !formatters.is_empty() {
            out.push(format!("{}Formatters:", pad(sub)));
            for f in &formatters {
                let id = match self.registry.lookup_id(f) {
                    Some(id) => format!("'{}'", id),
                    None => "unknown".to_string(),
                };
                out.push(format!("{}{}: {}", pad(sub + 1), id, f));
            }
        }
        if !logger.filters.is_empty() {
            out.push(format!("{}Filters:", pad(sub)));
            for f in &logger.filters {
                out.push(format!("{}{}", pad(sub + 1), f));
            }
        }
        for child in children {
            self.logger_lines(child, sub, true, show_all, visited, out)?;
        }
        Ok(())
    }

    fn handler_lines(
        &self,
        handler: &Handler,
        depth: usize,
        show_all: bool,
        nesting: usize,
        out: &mut Vec<String>,
    ) -> Result<()> {
        if nesting > MAX_LISTENER_DEPTH {
            return Err(Error::DepthExceeded {
                operation: "describe_handler",
                limit: MAX_LISTENER_DEPTH,
            });
        }
        let line = format!("{}{}", pad(depth), self.handler_summary(handler));
        trace!(%line);
        out.push(line);

        if let HandlerKind::Queue(relay) = &handler.kind {
            match &relay.listener {
                Some(listener) if show_all && !listener.handlers.is_empty() => {
                    for inner in &listener.handlers {
                        self.handler_lines(inner, depth + 1, show_all, nesting + 1, out)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn handler_summary(&self, handler: &Handler) -> String {
        let identity = match &handler.name {
            Some(name) => format!("{} '{}'", handler.type_name(), name),
            None => handler.type_name().to_string(),
        };
        let details = match &handler.kind {
            HandlerKind::Other { type_name } => return format!("Handler: type='{}'", type_name),
            HandlerKind::Stream(target) => format!(
                "stream={}, level={}, {}",
                target,
                handler.level,
                self.formatter_identity(handler)
            ),
            HandlerKind::File(target) => {
                let mut s = format!(
                    "path='{}', mode='{}', level={}",
                    target.path.display(),
                    target.mode,
                    handler.level
                );
                match &target.rotation {
                    Rotation::None => {}
                    Rotation::Size {
                        max_bytes,
                        backup_count,
                    } => s.push_str(&format!(
                        ", maxBytes={}, backupCount={}",
                        max_bytes, backup_count
                    )),
                    Rotation::Timed {
                        when,
                        interval,
                        backup_count,
                    } => s.push_str(&format!(
                        ", when='{}', interval={}, backupCount={}",
                        when, interval, backup_count
                    )),
                }
                if let Some(enc) = &target.encoding {
                    s.push_str(&format!(", encoding='{}'", enc));
                }
                if target.delay {
                    s.push_str(", delay=True");
                }
                s
            }
            HandlerKind::Queue(relay) => {
                let listener = match &relay.listener {
                    Some(l) => format!(
                        "QueueListener(started={}, respect_handler_level={}), Handlers({})",
                        bool_label(l.started),
                        bool_label(l.respect_handler_level),
                        l.handlers.len()
                    ),
                    None => "none".to_string(),
                };
                format!(
                    "queue=<{}>, level={}, Listener: {}",
                    relay.queue, handler.level, listener
                )
            }
        };
        format!("{}: {}, Filters({})", identity, details, handler.filters.len())
    }

    fn formatter_identity(&self, handler: &Handler) -> String {
        match &handler.formatter {
            None => "formatter=none, id=none".to_string(),
            Some(f) => match self.registry.lookup_id(f) {
                Some(id) => format!("formatter={}, id='{}'", f, id),
                None => {
                    debug!(formatter=%f, "formatter has no configuration id");
                    format!("formatter={}, id=unknown", f)
                }
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub show_all: bool,
    pub emit_json: bool,
    pub format: OutputFormat,
    /// Logger to start from; the root when `None`.
    pub start_at: Option<String>,
    pub config_root: Option<PathBuf>,
}

impl Default for ShowOptions {
    fn default() -> Self {
        ShowOptions {
            show_all: true,
            emit_json: false,
            format: OutputFormat::Text,
            start_at: None,
            config_root: None,
        }
    }
}

/// Applies `source` and renders the report, followed by the loaded document
/// when `emit_json` is set.
pub fn render_logging_setup(source: &ConfigSource, opts: &ShowOptions) -> Result<String> {
    let loaded = config::apply(
        DEFAULT_LOGGER_NAME,
        source,
        opts.config_root.as_deref(),
        false,
    )
    .map_err(|e| {
        error!(error=%e, source=?source, "failed to apply logging configuration");
        e
    })?;

    let reporter = Reporter::new(&loaded.tree, &loaded.registry);
    let start = match &opts.start_at {
        Some(name) => loaded.tree.get(name).ok_or_else(|| {
            error!(logger=%name, "requested start logger does not exist");
            Error::UnknownLogger { name: name.clone() }
        })?,
        None => loaded.tree.root(),
    };

    let mut out = match opts.format {
        OutputFormat::Text => reporter.describe_logger(Node::Logger(start), 0, opts.show_all)?,
        OutputFormat::Json => {
            to_json_indented(&reporter.snapshot(Node::Logger(start))?, "logger snapshot")?
        }
    };
    if opts.emit_json {
        out.push('\n');
        out.push_str(&to_json_indented(&loaded.document, "configuration echo")?);
    }
    Ok(out)
}

/// Loads `source`, prints the hierarchy report from the root logger, and
/// with `emit_json` also prints the configuration document that was loaded.
pub fn show_logging_setup(source: &ConfigSource, show_all: bool, emit_json: bool) -> Result<()> {
    let opts = ShowOptions {
        show_all,
        emit_json,
        config_root: default_config_root(),
        ..ShowOptions::default()
    };
    show_logging_setup_with(source, &opts)
}

pub fn show_logging_setup_with(source: &ConfigSource, opts: &ShowOptions) -> Result<()> {
    let text = render_logging_setup(source, opts)?;
    println!("{}", text);
    Ok(())
}
