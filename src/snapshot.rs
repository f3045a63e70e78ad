use crate::error::{Error, Result};
use crate::model::{Handler, HandlerKind, Logger, Node, Rotation};
use crate::report::{Reporter, MAX_LISTENER_DEPTH};

use serde::Serialize;
use tracing::{error, warn};

use std::collections::BTreeSet;
use std::path::PathBuf;

/// Machine-readable mirror of `describe_logger` with `show_all`.
///
/// Walks the same structure with the same type check and listener depth limit.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LoggerSnapshot {
    pub name: String,
    pub level: String,
    pub effective_level: String,
    pub propagate: bool,
    pub disabled: bool,
    pub parent: Option<String>,
    pub handlers: Vec<HandlerSnapshot>,
    pub formatters: Vec<FormatterSnapshot>,
    pub filters: Vec<String>,
    pub children: Vec<LoggerSnapshot>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FormatterSnapshot {
    /// `None` when the formatter was never declared in the document.
    pub id: Option<String>,
    pub repr: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListenerSnapshot {
    pub started: bool,
    pub respect_handler_level: bool,
    pub handlers: Vec<HandlerSnapshot>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerSnapshot {
    Stream {
        name: Option<String>,
        level: String,
        stream: String,
        formatter: Option<FormatterSnapshot>,
        filters: Vec<String>,
    },
    File {
        #[serde(rename = "type")]
        type_name: String,
        name: Option<String>,
        level: String,
        path: PathBuf,
        mode: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_bytes: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        when: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        interval: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        backup_count: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        encoding: Option<String>,
        delay: bool,
        filters: Vec<String>,
    },
    Queue {
        name: Option<String>,
        level: String,
        queue: String,
        listener: Option<ListenerSnapshot>,
        filters: Vec<String>,
    },
    Other {
        #[serde(rename = "type")]
        type_name: String,
    },
}

impl<'a> Reporter<'a> {
    /// Builds a serializable snapshot of `node` and everything below it.
    ///
    /// # Errors
    /// - `Error::TypeMismatch` if `node` is not a logger.
    /// - `Error::DepthExceeded` for over-nested queue listeners.
    pub fn snapshot(&self, node: Node<'_>) -> Result<LoggerSnapshot> {
        let logger = match node {
            Node::Logger(l) => l,
            other => {
                return Err(Error::TypeMismatch {
                    operation: "snapshot",
                    expected: "logger",
                    found: other.label(),
                })
            }
        };
        let mut visited = BTreeSet::new();
        self.logger_snapshot(logger, &mut visited).map_err(|e| {
            error!(error=%e, logger=%logger.name, "snapshot failed");
            e
        })
    }

    fn logger_snapshot(
        &self,
        logger: &Logger,
        visited: &mut BTreeSet<String>,
    ) -> Result<LoggerSnapshot> {
        let tree = self.tree();
        let mut children = Vec::new();
        for child in tree.children(logger) {
            if !visited.insert(child.name.clone()) {
                warn!(logger=%child.name, "logger reached twice; not descending again");
                continue;
            }
            children.push(self.logger_snapshot(child, visited)?);
        }

        Ok(LoggerSnapshot {
            name: logger.name.clone(),
            level: logger.level.to_string(),
            effective_level: tree.effective_level(logger).to_string(),
            propagate: logger.propagate,
            disabled: logger.disabled,
            parent: tree.parent_name(&logger.name).map(str::to_string),
            handlers: logger
                .handlers
                .iter()
                .map(|h| self.handler_snapshot(h, 0))
                .collect::<Result<_>>()?,
            formatters: logger
                .formatters()
                .iter()
                .map(|f| FormatterSnapshot {
                    id: self.registry().lookup_id(f).map(str::to_string),
                    repr: f.to_string(),
                })
                .collect(),
            filters: logger.filters.iter().map(|f| f.to_string()).collect(),
            children,
        })
    }

    fn handler_snapshot(&self, handler: &Handler, nesting: usize) -> Result<HandlerSnapshot> {
        if nesting > MAX_LISTENER_DEPTH {
            return Err(Error::DepthExceeded {
                operation: "snapshot",
                limit: MAX_LISTENER_DEPTH,
            });
        }
        let name = handler.name.clone();
        let level = handler.level.to_string();
        let filters: Vec<String> = handler.filters.iter().map(|f| f.to_string()).collect();

        Ok(match &handler.kind {
            HandlerKind::Stream(target) => HandlerSnapshot::Stream {
                name,
                level,
                stream: target.to_string(),
                formatter: handler.formatter.as_ref().map(|f| FormatterSnapshot {
                    id: self.registry().lookup_id(f).map(str::to_string),
                    repr: f.to_string(),
                }),
                filters,
            },
            HandlerKind::File(target) => {
                let (max_bytes, when, interval, backup_count) = match &target.rotation {
                    Rotation::None => (None, None, None, None),
                    Rotation::Size {
                        max_bytes,
                        backup_count,
                    } => (Some(*max_bytes), None, None, Some(*backup_count)),
                    Rotation::Timed {
                        when,
                        interval,
                        backup_count,
                    } => (None, Some(when.clone()), Some(*interval), Some(*backup_count)),
                };
                HandlerSnapshot::File {
                    type_name: handler.type_name().to_string(),
                    name,
                    level,
                    path: target.path.clone(),
                    mode: target.mode.clone(),
                    max_bytes,
                    when,
                    interval,
                    backup_count,
                    encoding: target.encoding.clone(),
                    delay: target.delay,
                    filters,
                }
            }
            HandlerKind::Queue(relay) => HandlerSnapshot::Queue {
                name,
                level,
                queue: relay.queue.clone(),
                listener: match &relay.listener {
                    Some(l) => Some(ListenerSnapshot {
                        started: l.started,
                        respect_handler_level: l.respect_handler_level,
                        handlers: l
                            .handlers
                            .iter()
                            .map(|h| self.handler_snapshot(h, nesting + 1))
                            .collect::<Result<_>>()?,
                    }),
                    None => None,
                },
                filters,
            },
            HandlerKind::Other { type_name } => HandlerSnapshot::Other {
                type_name: type_name.clone(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{apply, ConfigSource};
    use crate::util::to_json_indented;

    #[test]
    fn test_snapshot_mirrors_text_report_counts() {
        let loaded = apply("loginfo", &ConfigSource::Named("file".into()), None, false).unwrap();
        let reporter = Reporter::new(&loaded.tree, &loaded.registry);
        let root = loaded.tree.root();

        let snap = reporter.snapshot(Node::Logger(root)).unwrap();
        let text = reporter.describe_logger(Node::Logger(root), 0, true).unwrap();

        assert_eq!(snap.name, "root");
        assert_eq!(snap.parent, None);
        assert_eq!(snap.handlers.len(), 2);
        assert_eq!(snap.formatters.len(), 2);
        assert_eq!(
            snap.children.len(),
            text.lines().filter(|l| l.starts_with("  child: ")).count()
        );
        assert_eq!(snap.children[0].name, "loginfo");
        assert_eq!(snap.children[0].level, "NOTSET");
        assert_eq!(snap.children[0].effective_level, "DEBUG");
    }

    #[test]
    fn test_snapshot_json_tags_handler_kinds() {
        let loaded = apply("loginfo", &ConfigSource::Named("queue".into()), None, false).unwrap();
        let reporter = Reporter::new(&loaded.tree, &loaded.registry);
        let snap = reporter.snapshot(Node::Logger(loaded.tree.root())).unwrap();

        let HandlerSnapshot::Queue { listener, .. } = &snap.handlers[0] else {
            panic!("expected queue handler, got {:?}", snap.handlers[0]);
        };
        let listener = listener.as_ref().expect("queue config has a listener");
        assert!(listener.respect_handler_level);
        assert_eq!(listener.handlers.len(), 2);

        let json = to_json_indented(&snap, "test").unwrap();
        assert!(json.contains("\"kind\": \"queue\""), "{}", json);
        assert!(json.contains("\"type\": \"TimedRotatingFileHandler\""), "{}", json);
        assert!(json.contains("\"when\": \"midnight\""), "{}", json);
    }

    #[test]
    fn test_timed_file_snapshot_keeps_interval_encoding_delay() {
        use crate::config::configure;
        use crate::model::LoggerTree;
        use serde_json::json;

        let mut tree = LoggerTree::new();
        let registry = configure(
            &mut tree,
            &json!({
                "version": 1,
                "handlers": {
                    "hourly": {
                        "class": "logging.handlers.TimedRotatingFileHandler",
                        "filename": "hourly.log",
                        "when": "h",
                        "interval": 6,
                        "backupCount": 2,
                        "encoding": "utf-8",
                        "delay": true
                    }
                },
                "root": {"handlers": ["hourly"]}
            }),
            false,
        )
        .expect("document applies");
        let reporter = Reporter::new(&tree, &registry);
        let snap = reporter.snapshot(Node::Logger(tree.root())).unwrap();

        match &snap.handlers[0] {
            HandlerSnapshot::File {
                interval,
                encoding,
                delay,
                max_bytes,
                ..
            } => {
                assert_eq!(*interval, Some(6));
                assert_eq!(encoding.as_deref(), Some("utf-8"));
                assert!(*delay);
                assert_eq!(*max_bytes, None);
            }
            other => panic!("expected file handler, got {:?}", other),
        }

        let json = to_json_indented(&snap, "test").unwrap();
        assert!(json.contains("\"when\": \"h\""), "{}", json);
        assert!(json.contains("\"interval\": 6"), "snapshot lost interval: {}", json);
        assert!(json.contains("\"backup_count\": 2"), "{}", json);
        assert!(json.contains("\"encoding\": \"utf-8\""), "snapshot lost encoding: {}", json);
        assert!(json.contains("\"delay\": true"), "snapshot lost delay: {}", json);
        assert!(!json.contains("max_bytes"), "{}", json);
    }

    #[test]
    fn test_snapshot_rejects_non_logger() {
        let loaded = apply("loginfo", &ConfigSource::default(), None, false).unwrap();
        let reporter = Reporter::new(&loaded.tree, &loaded.registry);
        let h = &loaded.tree.root().handlers[0];
        let err = reporter.snapshot(Node::Handler(h)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { operation: "snapshot", .. }));
    }

    #[test]
    fn test_stream_formatter_id_is_null_when_unregistered() {
        use crate::model::{Formatter, LoggerTree, StreamTarget};
        use crate::registry::FormatterRegistry;
        use std::sync::Arc;

        let mut tree = LoggerTree::new();
        let mut h = Handler::new(HandlerKind::Stream(StreamTarget::Stdout));
        h.formatter = Some(Arc::new(Formatter::new(None)));
        tree.root_mut().handlers.push(Arc::new(h));
        let reg = FormatterRegistry::new();
        let reporter = Reporter::new(&tree, &reg);

        let snap = reporter.snapshot(Node::Logger(tree.root())).unwrap();
        match &snap.handlers[0] {
            HandlerSnapshot::Stream {
                formatter: Some(f), ..
            } => assert_eq!(f.id, None),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(snap.formatters[0].id, None);
    }
}
