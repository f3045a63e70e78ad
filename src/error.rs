use std::{fmt, io, path::PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    // config / fs
    ConfigDirUnavailable,
    Io {
        path: Option<PathBuf>,
        source: io::Error,
    },

    // parsing / serde
    Json {
        context: &'static str,
        source: serde_json::Error,
    },

    // configuration document rejected by the loader
    Config {
        context: String,
        message: String,
    },

    // reporter contract violations
    TypeMismatch {
        operation: &'static str,
        expected: &'static str,
        found: String,
    },
    DepthExceeded {
        operation: &'static str,
        limit: usize,
    },
    UnknownLogger {
        name: String,
    },
}

impl Error {
    /// Shorthand for a loader rejection with a location (`handlers.console`, `root`, ...).
    pub fn config(context: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            context: context.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    /// Formats the `Error` into a one-line message suitable for the terminal.
    ///
    /// Variants that wrap a foreign error include it after the context, so the
    /// message stays useful even when the caller does not walk `source()`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        match self {
            ConfigDirUnavailable => write!(f, "could not determine OS config directory"),
            Io { path, source } => match path {
                Some(p) => write!(f, "I/O error at {}: {}", p.display(), source),
                None => write!(f, "I/O error: {}", source),
            },
            Json { context, source } => write!(f, "JSON error in {}: {}", context, source),
            Config { context, message } => {
                write!(f, "invalid logging configuration at {}: {}", context, message)
            }
            TypeMismatch {
                operation,
                expected,
                found,
            } => write!(f, "{}: expected {}, got {}", operation, expected, found),
            DepthExceeded { operation, limit } => {
                write!(f, "{}: nesting deeper than {} levels", operation, limit)
            }
            UnknownLogger { name } => write!(f, "no logger named '{}'", name),
        }
    }
}

impl std::error::Error for Error {
    /// Returns the wrapped I/O or JSON error, if any.
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        use Error::*;
        match self {
            Io { source, .. } => Some(source),
            Json { source, .. } => Some(source),
            ConfigDirUnavailable
            | Config { .. }
            | TypeMismatch { .. }
            | DepthExceeded { .. }
            | UnknownLogger { .. } => None,
        }
    }
}
