use crate::error::{Error, Result};
use serde::Serialize;

/// Two spaces per depth level.
pub const INDENT_UNIT: &str = "  ";

pub fn pad(depth: usize) -> String {
    INDENT_UNIT.repeat(depth)
}

/// Pretty-prints `value` as JSON with a four-space indent.
pub fn to_json_indented<T: Serialize + ?Sized>(value: &T, context: &'static str) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| Error::Json { context, source: e })?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn bool_label(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pad_is_two_spaces_per_level() {
        assert_eq!(pad(0), "");
        assert_eq!(pad(3), "      ");
    }

    #[test]
    fn test_json_uses_four_space_indent() {
        let out = to_json_indented(&json!({"version": 1}), "test").unwrap();
        assert_eq!(out, "{\n    \"version\": 1\n}");
    }
}
