//! Safe scalar coercion.
//!
//! Design summaries arrive as loosely-typed JSON: counts show up as numbers
//! or numeric strings, ratings are sometimes null, and text fields may hold
//! any scalar. These helpers coerce arbitrary `serde_json::Value`s into the
//! shape a record field needs, with a defined fallback instead of an error.

use serde_json::Value;

/// Coerce a JSON value into a finite number.
///
/// Numbers pass through unchanged, numeric strings are parsed, everything
/// else (null, non-numeric text, non-finite results) yields `default`.
pub fn coerce_numeric(value: &Value, default: f64) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).unwrap_or(default),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .unwrap_or(default),
        _ => default,
    }
}

/// Coerce a JSON value into text of at most `max_chars` characters.
///
/// Strings are truncated, other scalars are stringified; null and compound
/// values yield `default`.
pub fn coerce_text(value: &Value, default: &str, max_chars: usize) -> String {
    match value {
        Value::String(s) => truncate_chars(s, max_chars).to_string(),
        Value::Number(n) => truncate_chars(&n.to_string(), max_chars).to_string(),
        Value::Bool(b) => b.to_string(),
        _ => default.to_string(),
    }
}

/// Character-prefix truncation on a char boundary.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Fetch a key from a JSON object, treating a missing key as null.
pub(crate) fn attr<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> &'a Value {
    static NULL: Value = Value::Null;
    obj.get(key).unwrap_or(&NULL)
}

/// Round to two decimal places.
pub(crate) fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_passthrough() {
        assert_eq!(coerce_numeric(&json!(42), 0.0), 42.0);
        assert_eq!(coerce_numeric(&json!(7.25), 0.0), 7.25);
    }

    #[test]
    fn numeric_strings_parse() {
        assert_eq!(coerce_numeric(&json!("12"), 0.0), 12.0);
        assert_eq!(coerce_numeric(&json!(" 3.5 "), 0.0), 3.5);
    }

    #[test]
    fn non_numeric_falls_back() {
        assert_eq!(coerce_numeric(&json!("ten"), 0.0), 0.0);
        assert_eq!(coerce_numeric(&Value::Null, 5.0), 5.0);
        assert_eq!(coerce_numeric(&json!({"a": 1}), 1.0), 1.0);
        assert_eq!(coerce_numeric(&json!(true), 2.0), 2.0);
    }

    #[test]
    fn text_truncates() {
        assert_eq!(coerce_text(&json!("hello world"), "N/A", 5), "hello");
        assert_eq!(coerce_text(&json!("hi"), "N/A", 5), "hi");
    }

    #[test]
    fn text_stringifies_scalars() {
        assert_eq!(coerce_text(&json!(12), "N/A", 100), "12");
        assert_eq!(coerce_text(&json!(true), "N/A", 100), "true");
    }

    #[test]
    fn text_falls_back_for_null_and_compound() {
        assert_eq!(coerce_text(&Value::Null, "N/A", 100), "N/A");
        assert_eq!(coerce_text(&json!([1, 2]), "N/A", 100), "N/A");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // multi-byte characters must not be split mid-codepoint
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("héllo", 10), "héllo");
    }
}
