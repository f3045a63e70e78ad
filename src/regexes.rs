use regex::Regex;
use std::sync::OnceLock;

/// Dotted logger names: identifier-like segments separated by single dots.
pub fn re_logger_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*(?:\.[A-Za-z_][A-Za-z0-9_-]*)*$").unwrap()
    })
}

/// `ext://sys.stdout` / `ext://sys.stderr`, capturing the stream name.
pub fn re_ext_stream() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ext://sys\.(stdout|stderr)$").unwrap())
}

/// Any other `ext://` reference, capturing the dotted target.
pub fn re_ext_ref() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ext://([A-Za-z_][A-Za-z0-9_.]*)$").unwrap())
}

/// Bare configuration names such as `stdout` or `queue-json`.
pub fn re_config_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_name_rejects_empty_segments() {
        assert!(re_logger_name().is_match("app"));
        assert!(re_logger_name().is_match("app.db-pool.v2"));
        assert!(!re_logger_name().is_match("app..db"));
        assert!(!re_logger_name().is_match(".app"));
        assert!(!re_logger_name().is_match("app."));
    }

    #[test]
    fn test_ext_stream_captures_name() {
        let caps = re_ext_stream().captures("ext://sys.stderr").unwrap();
        assert_eq!(&caps[1], "stderr");
        assert!(re_ext_stream().captures("ext://sys.stdin").is_none());
        assert_eq!(
            &re_ext_ref().captures("ext://mypkg.streams.audit").unwrap()[1],
            "mypkg.streams.audit"
        );
    }

    #[test]
    fn test_config_name_excludes_paths() {
        assert!(re_config_name().is_match("stdout"));
        assert!(!re_config_name().is_match("configs/stdout.json"));
        assert!(!re_config_name().is_match("stdout.json"));
    }
}
