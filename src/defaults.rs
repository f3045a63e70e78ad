/// Logger that every applied configuration guarantees to exist.
pub const DEFAULT_LOGGER_NAME: &str = "loginfo";

/// Named configuration used when none is given.
pub const DEFAULT_CONFIG_NAME: &str = "stdout";

pub const STDOUT_CONFIG_JSON: &str = r#"{
    "version": 1,
    "disable_existing_loggers": false,
    "formatters": {
        "simple": {
            "format": "%(levelname)s: %(message)s"
        }
    },
    "handlers": {
        "stdout": {
            "class": "logging.StreamHandler",
            "formatter": "simple",
            "stream": "ext://sys.stdout"
        }
    },
    "root": {
        "level": "DEBUG",
        "handlers": ["stdout"]
    }
}
"#;

pub const FILE_CONFIG_JSON: &str = r#"{
    "version": 1,
    "disable_existing_loggers": false,
    "formatters": {
        "simple": {
            "format": "%(levelname)s: %(message)s"
        },
        "detailed": {
            "format": "[%(levelname)s|%(module)s|L%(lineno)d] %(asctime)s: %(message)s",
            "datefmt": "%Y-%m-%dT%H:%M:%S%z"
        }
    },
    "handlers": {
        "stdout": {
            "class": "logging.StreamHandler",
            "level": "INFO",
            "formatter": "simple",
            "stream": "ext://sys.stdout"
        },
        "file": {
            "class": "logging.handlers.RotatingFileHandler",
            "level": "DEBUG",
            "formatter": "detailed",
            "filename": "logs/loginfo.log",
            "maxBytes": 1048576,
            "backupCount": 3
        }
    },
    "root": {
        "level": "DEBUG",
        "handlers": ["stdout", "file"]
    }
}
"#;

pub const QUEUE_CONFIG_JSON: &str = r#"{
    "version": 1,
    "disable_existing_loggers": false,
    "formatters": {
        "simple": {
            "format": "%(levelname)s: %(message)s"
        },
        "detailed": {
            "format": "[%(levelname)s|%(module)s|L%(lineno)d] %(asctime)s: %(message)s",
            "datefmt": "%Y-%m-%dT%H:%M:%S%z"
        }
    },
    "handlers": {
        "stderr": {
            "class": "logging.StreamHandler",
            "level": "WARNING",
            "formatter": "simple",
            "stream": "ext://sys.stderr"
        },
        "file": {
            "class": "logging.handlers.TimedRotatingFileHandler",
            "level": "DEBUG",
            "formatter": "detailed",
            "filename": "logs/loginfo.log",
            "when": "midnight",
            "interval": 1,
            "backupCount": 7
        },
        "queue_handler": {
            "class": "logging.handlers.QueueHandler",
            "handlers": ["stderr", "file"],
            "respect_handler_level": true
        }
    },
    "loggers": {
        "root": {
            "level": "DEBUG",
            "handlers": ["queue_handler"]
        }
    }
}
"#;

/// Built-in configurations, by name.
pub const BUILTIN_CONFIGS: &[(&str, &str)] = &[
    ("stdout", STDOUT_CONFIG_JSON),
    ("file", FILE_CONFIG_JSON),
    ("queue", QUEUE_CONFIG_JSON),
];

pub fn builtin_config(name: &str) -> Option<&'static str> {
    BUILTIN_CONFIGS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, json)| *json)
}
