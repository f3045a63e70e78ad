pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod model;
pub mod regexes;
pub mod registry;
pub mod report;
pub mod snapshot;
pub mod util;

pub use config::{apply, ConfigSource, LoadedConfig};
pub use error::{Error, Result};
pub use model::{Handler, HandlerKind, Level, Logger, LoggerTree, Node};
pub use registry::FormatterRegistry;
pub use report::{show_logging_setup, Reporter, Selection, ShowOptions};
