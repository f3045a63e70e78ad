use crate::defaults::{builtin_config, DEFAULT_CONFIG_NAME};
use crate::error::{Error, Result};
use crate::model::{
    last_segment, FileTarget, Filter, FilterKind, Formatter, Handler, HandlerKind, Level,
    LoggerTree, QueueListener, QueueRelay, Rotation, StreamTarget, ROOT_LOGGER_NAME,
};
use crate::regexes::{re_config_name, re_ext_ref, re_ext_stream, re_logger_name};
use crate::registry::FormatterRegistry;

use directories::ProjectDirs;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where a configuration document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Path(PathBuf),
    /// A configuration name, looked up under `<config root>/configs/` and then
    /// among the built-in configurations.
    Named(String),
    Inline(Value),
}

impl Default for ConfigSource {
    fn default() -> Self {
        ConfigSource::Named(DEFAULT_CONFIG_NAME.to_string())
    }
}

impl ConfigSource {
    /// Interprets a CLI argument: a bare name that is not an existing file is
    /// a named configuration, anything else is a path.
    pub fn from_arg(arg: &str) -> Self {
        if re_config_name().is_match(arg) && !Path::new(arg).exists() {
            ConfigSource::Named(arg.to_string())
        } else {
            ConfigSource::Path(PathBuf::from(arg))
        }
    }

    /// Reads and parses the document. `config_root` is only consulted for
    /// named sources.
    pub fn load(&self, config_root: Option<&Path>) -> Result<Value> {
        match self {
            ConfigSource::Inline(v) => Ok(v.clone()),
            ConfigSource::Path(p) => read_document(p),
            ConfigSource::Named(name) => {
                if let Some(root) = config_root {
                    let candidate = named_config_path(root, name);
                    if candidate.is_file() {
                        debug!(path=?candidate, "using named configuration from config root");
                        return read_document(&candidate);
                    }
                }
                let text = builtin_config(name).ok_or_else(|| {
                    Error::config("source", format!("no configuration named '{}'", name))
                })?;
                debug!(name = %name, "using built-in configuration");
                serde_json::from_str(text).map_err(|e| Error::Json {
                    context: "built-in logging configuration",
                    source: e,
                })
            }
        }
    }
}

/// Platform config directory for loginfo (e.g. `~/.config/loginfo` on Linux).
///
/// # Errors
/// - `Error::ConfigDirUnavailable` when no home directory can be determined.
pub fn config_root() -> Result<PathBuf> {
    let proj = ProjectDirs::from("org", "loginfo", "loginfo").ok_or(Error::ConfigDirUnavailable)?;
    Ok(proj.config_dir().to_path_buf())
}

/// [`config_root`], or `None` when the platform has none; named sources then
/// fall back to the built-in configurations.
pub fn default_config_root() -> Option<PathBuf> {
    match config_root() {
        Ok(root) => Some(root),
        Err(e) => {
            warn!(error=%e, "no config root; only built-in configurations are available");
            None
        }
    }
}

pub fn named_config_path(config_root: &Path, name: &str) -> PathBuf {
    config_root.join("configs").join(format!("{}.json", name))
}

fn read_document(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| Error::Io {
        path: Some(path.to_path_buf()),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| Error::Json {
        context: "logging configuration file",
        source: e,
    })
}

/// Result of applying a configuration: the live hierarchy, the formatter ids
/// it declared, and the document itself for echoing.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub tree: LoggerTree,
    pub registry: FormatterRegistry,
    pub document: Value,
}

/// Loads `source`, builds a fresh hierarchy from it and makes sure
/// `logger_name` exists. With `start_async_delivery`, every queue listener is
/// marked started.
///
/// The tree starts out holding only the root logger, so the document's
/// `disable_existing_loggers` flag has nothing to disable here. It only takes
/// effect when [`configure`] runs against an already populated tree.
pub fn apply(
    logger_name: &str,
    source: &ConfigSource,
    config_root: Option<&Path>,
    start_async_delivery: bool,
) -> Result<LoadedConfig> {
    if !re_logger_name().is_match(logger_name) {
        return Err(Error::config(
            "logger_name",
            format!("invalid logger name '{}'", logger_name),
        ));
    }
    let document = source.load(config_root)?;
    let mut tree = LoggerTree::new();
    let registry = configure(&mut tree, &document, start_async_delivery)?;
    tree.get_or_create(logger_name);
    info!(
        loggers = tree.len(),
        formatters = registry.len(),
        "logging configuration applied"
    );
    Ok(LoadedConfig {
        tree,
        registry,
        document,
    })
}

// ---------- document shape ----------

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct DictConfig {
    version: Option<u32>,
    #[serde(default)]
    incremental: bool,
    #[serde(default = "default_true")]
    disable_existing_loggers: bool,
    #[serde(default)]
    formatters: BTreeMap<String, FormatterSpec>,
    #[serde(default)]
    filters: BTreeMap<String, FilterSpec>,
    #[serde(default)]
    handlers: BTreeMap<String, HandlerSpec>,
    #[serde(default)]
    loggers: BTreeMap<String, LoggerSpec>,
    root: Option<LoggerSpec>,
}

#[derive(Debug, Deserialize)]
struct FormatterSpec {
    #[serde(alias = "fmt")]
    format: Option<String>,
    datefmt: Option<String>,
    style: Option<String>,
    class: Option<String>,
    #[serde(rename = "()")]
    factory: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FilterSpec {
    name: Option<String>,
    #[serde(rename = "()")]
    factory: Option<String>,
    #[serde(flatten)]
    params: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LevelSpec {
    Number(u32),
    Name(String),
}

#[derive(Debug, Deserialize)]
struct HandlerSpec {
    class: Option<String>,
    #[serde(rename = "()")]
    factory: Option<String>,
    level: Option<LevelSpec>,
    formatter: Option<String>,
    #[serde(default)]
    filters: Vec<String>,
    stream: Option<String>,
    filename: Option<PathBuf>,
    mode: Option<String>,
    encoding: Option<String>,
    #[serde(default)]
    delay: bool,
    #[serde(rename = "maxBytes", default)]
    max_bytes: u64,
    #[serde(rename = "backupCount", default)]
    backup_count: u32,
    when: Option<String>,
    interval: Option<u32>,
    queue: Option<String>,
    #[serde(default)]
    handlers: Vec<String>,
    #[serde(default)]
    respect_handler_level: bool,
}

#[derive(Debug, Deserialize)]
struct LoggerSpec {
    level: Option<LevelSpec>,
    propagate: Option<bool>,
    #[serde(default)]
    handlers: Vec<String>,
    #[serde(default)]
    filters: Vec<String>,
}

// ---------- building ----------

/// Applies `document` to `tree` and returns the registry of declared formatters.
///
/// The document is a JSON object with `version: 1` and optional `formatters`,
/// `filters`, `handlers`, `loggers` and `root` sections. Handler classes are
/// recognised by their dotted name; anything unknown becomes
/// [`HandlerKind::Other`]. Nothing here opens files or streams.
///
/// Loggers already present in `tree` that the document does not name (and
/// that do not descend from a named logger) are disabled when
/// `disable_existing_loggers` is true.
pub fn configure(
    tree: &mut LoggerTree,
    document: &Value,
    start_async_delivery: bool,
) -> Result<FormatterRegistry> {
    let cfg: DictConfig = serde_json::from_value(document.clone()).map_err(|e| Error::Json {
        context: "logging configuration document",
        source: e,
    })?;

    match cfg.version {
        Some(1) => {}
        Some(v) => return Err(Error::config("version", format!("unsupported version {}", v))),
        None => return Err(Error::config("version", "missing 'version' key")),
    }
    if cfg.incremental {
        return Err(Error::config(
            "incremental",
            "incremental configuration is not supported",
        ));
    }

    let mut registry = FormatterRegistry::new();
    for (id, spec) in &cfg.formatters {
        let formatter = build_formatter(id, spec)?;
        debug!(id = %id, formatter = %formatter, "formatter");
        registry.register(id.clone(), Arc::new(formatter));
    }

    let mut filters: BTreeMap<String, Arc<Filter>> = BTreeMap::new();
    for (id, spec) in &cfg.filters {
        filters.insert(id.clone(), Arc::new(build_filter(id, spec)?));
    }

    let mut builder = HandlerBuilder {
        specs: &cfg.handlers,
        registry: &registry,
        filters: &filters,
        start_async_delivery,
        built: BTreeMap::new(),
        visiting: Vec::new(),
    };
    for id in cfg.handlers.keys() {
        builder.build(id)?;
    }
    let handlers = builder.built;

    let existing: Vec<String> = tree
        .loggers()
        .filter(|l| !l.is_root())
        .map(|l| l.name.clone())
        .collect();
    let mut named: BTreeSet<String> = BTreeSet::new();

    for (name, spec) in &cfg.loggers {
        let context = format!("loggers.{}", name);
        if name != ROOT_LOGGER_NAME && !re_logger_name().is_match(name) {
            return Err(Error::config(context, "invalid logger name"));
        }
        apply_logger(tree, name, spec, &handlers, &filters, &context)?;
        named.insert(name.clone());
    }
    if let Some(spec) = &cfg.root {
        apply_logger(tree, ROOT_LOGGER_NAME, spec, &handlers, &filters, "root")?;
    }

    if cfg.disable_existing_loggers {
        for name in existing {
            let keep = named
                .iter()
                .any(|n| name == *n || name.starts_with(&format!("{}.", n)));
            if !keep {
                warn!(logger = %name, "disabling existing logger not named by configuration");
                tree.get_or_create(&name).disabled = true;
            }
        }
    }

    Ok(registry)
}

fn apply_logger(
    tree: &mut LoggerTree,
    name: &str,
    spec: &LoggerSpec,
    handlers: &BTreeMap<String, Arc<Handler>>,
    filters: &BTreeMap<String, Arc<Filter>>,
    context: &str,
) -> Result<()> {
    let level = match &spec.level {
        Some(l) => Some(parse_level(l, context)?),
        None => None,
    };
    let resolved_handlers = resolve_refs(&spec.handlers, handlers, context, "handler")?;
    let resolved_filters = resolve_refs(&spec.filters, filters, context, "filter")?;

    let logger = tree.get_or_create(name);
    if let Some(level) = level {
        logger.level = level;
    }
    if !logger.is_root() {
        logger.propagate = spec.propagate.unwrap_or(true);
    }
    logger.disabled = false;
    logger.handlers = resolved_handlers;
    logger.filters = resolved_filters;
    debug!(
        logger = %name,
        level = %logger.level,
        handlers = logger.handlers.len(),
        "logger configured"
    );
    Ok(())
}

fn resolve_refs<T>(
    ids: &[String],
    known: &BTreeMap<String, Arc<T>>,
    context: &str,
    what: &str,
) -> Result<Vec<Arc<T>>> {
    ids.iter()
        .map(|id| {
            known.get(id).cloned().ok_or_else(|| {
                Error::config(context.to_string(), format!("unknown {} '{}'", what, id))
            })
        })
        .collect()
}

fn parse_level(spec: &LevelSpec, context: &str) -> Result<Level> {
    match spec {
        LevelSpec::Number(n) => Ok(Level::new(*n)),
        LevelSpec::Name(s) => Level::from_name(s)
            .ok_or_else(|| Error::config(context.to_string(), format!("unknown level '{}'", s))),
    }
}

fn build_formatter(id: &str, spec: &FormatterSpec) -> Result<Formatter> {
    let style = match spec.style.as_deref() {
        None => '%',
        Some(s @ ("%" | "{" | "$")) => s.chars().next().unwrap_or('%'),
        Some(other) => {
            return Err(Error::config(
                format!("formatters.{}", id),
                format!("style must be one of '%', '{{', '$', got '{}'", other),
            ))
        }
    };
    Ok(Formatter {
        format: spec.format.clone(),
        datefmt: spec.datefmt.clone(),
        style,
        class: spec.factory.clone().or_else(|| spec.class.clone()),
    })
}

fn build_filter(id: &str, spec: &FilterSpec) -> Result<Filter> {
    let kind = match (&spec.factory, &spec.name) {
        (Some(factory), _) => {
            let mut params = spec.params.clone();
            if let Some(name) = &spec.name {
                params.insert("name".to_string(), Value::String(name.clone()));
            }
            FilterKind::Custom {
                factory: factory.clone(),
                params,
            }
        }
        (None, name) => {
            if !spec.params.is_empty() {
                return Err(Error::config(
                    format!("filters.{}", id),
                    "only 'name' is accepted without a '()' factory",
                ));
            }
            FilterKind::Name(name.clone().unwrap_or_default())
        }
    };
    Ok(Filter {
        id: id.to_string(),
        kind,
    })
}

fn parse_stream(s: &str) -> StreamTarget {
    if let Some(caps) = re_ext_stream().captures(s) {
        return match &caps[1] {
            "stdout" => StreamTarget::Stdout,
            _ => StreamTarget::Stderr,
        };
    }
    match re_ext_ref().captures(s) {
        Some(caps) => StreamTarget::External(caps[1].to_string()),
        None => StreamTarget::External(s.to_string()),
    }
}

/// Builds handlers on demand so queue handlers can refer to handlers declared
/// after them; `visiting` catches circular references.
struct HandlerBuilder<'a> {
    specs: &'a BTreeMap<String, HandlerSpec>,
    registry: &'a FormatterRegistry,
    filters: &'a BTreeMap<String, Arc<Filter>>,
    start_async_delivery: bool,
    built: BTreeMap<String, Arc<Handler>>,
    visiting: Vec<String>,
}

impl<'a> HandlerBuilder<'a> {
    fn build(&mut self, id: &str) -> Result<Arc<Handler>> {
        if let Some(h) = self.built.get(id) {
            return Ok(Arc::clone(h));
        }
        let context = format!("handlers.{}", id);
        if self.visiting.iter().any(|v| v == id) {
            let mut chain = self.visiting.clone();
            chain.push(id.to_string());
            return Err(Error::config(
                context,
                format!("circular handler reference: {}", chain.join(" -> ")),
            ));
        }
        let specs = self.specs;
        let spec = specs
            .get(id)
            .ok_or_else(|| Error::config(context.clone(), "unknown handler"))?;

        self.visiting.push(id.to_string());
        let kind = self.build_kind(id, spec, &context);
        self.visiting.pop();
        let kind = kind?;

        let formatter = match &spec.formatter {
            Some(fid) => Some(Arc::clone(self.registry.get(fid).ok_or_else(|| {
                Error::config(context.clone(), format!("unknown formatter '{}'", fid))
            })?)),
            None => None,
        };
        let handler = Handler {
            name: Some(id.to_string()),
            level: match &spec.level {
                Some(l) => parse_level(l, &context)?,
                None => Level::NOTSET,
            },
            formatter,
            filters: resolve_refs(&spec.filters, self.filters, &context, "filter")?,
            kind,
        };
        debug!(id = %id, kind = handler.type_name(), "handler");
        let handler = Arc::new(handler);
        self.built.insert(id.to_string(), Arc::clone(&handler));
        Ok(handler)
    }

    fn build_kind(&mut self, id: &str, spec: &HandlerSpec, context: &str) -> Result<HandlerKind> {
        let class = match (&spec.factory, &spec.class) {
            (Some(factory), _) => {
                return Ok(HandlerKind::Other {
                    type_name: last_segment(factory).to_string(),
                })
            }
            (None, Some(class)) => class.as_str(),
            (None, None) => return Err(Error::config(context.to_string(), "missing 'class'")),
        };

        let file_target = |rotation: Rotation| -> Result<HandlerKind> {
            let path = spec
                .filename
                .clone()
                .ok_or_else(|| Error::config(context.to_string(), "missing 'filename'"))?;
            Ok(HandlerKind::File(FileTarget {
                path,
                mode: spec.mode.clone().unwrap_or_else(|| "a".to_string()),
                encoding: spec.encoding.clone(),
                delay: spec.delay,
                rotation,
            }))
        };

        match class {
            "logging.StreamHandler" => Ok(HandlerKind::Stream(
                spec.stream
                    .as_deref()
                    .map(parse_stream)
                    .unwrap_or(StreamTarget::Stderr),
            )),
            "logging.FileHandler" => file_target(Rotation::None),
            "logging.handlers.RotatingFileHandler" => file_target(Rotation::Size {
                max_bytes: spec.max_bytes,
                backup_count: spec.backup_count,
            }),
            "logging.handlers.TimedRotatingFileHandler" => file_target(Rotation::Timed {
                when: spec.when.clone().unwrap_or_else(|| "h".to_string()),
                interval: spec.interval.unwrap_or(1),
                backup_count: spec.backup_count,
            }),
            "logging.handlers.QueueHandler" => {
                let listener = if spec.handlers.is_empty() {
                    None
                } else {
                    let mut handlers = Vec::with_capacity(spec.handlers.len());
                    for hid in &spec.handlers {
                        if !self.specs.contains_key(hid) {
                            return Err(Error::config(
                                context.to_string(),
                                format!("unknown handler '{}'", hid),
                            ));
                        }
                        handlers.push(self.build(hid)?);
                    }
                    Some(QueueListener {
                        handlers,
                        respect_handler_level: spec.respect_handler_level,
                        started: self.start_async_delivery,
                    })
                };
                debug!(id = %id, listener = listener.is_some(), "queue handler");
                Ok(HandlerKind::Queue(QueueRelay {
                    queue: spec.queue.clone().unwrap_or_else(|| "queue.Queue".to_string()),
                    listener,
                }))
            }
            other => Ok(HandlerKind::Other {
                type_name: last_segment(other).to_string(),
            }),
        }
    }
}
