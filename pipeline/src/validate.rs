//! Record validator: last line of defense before dispatch.
//!
//! Operates on the integer-keyed wire map immediately before the upsert.
//! Fields outside the registry are dropped with a diagnostic rather than
//! failing the whole record, explicit nulls are dropped (absent differs
//! from null at this stage; defaults are not re-applied), text is clamped
//! to a hard ceiling, and embedded JSON snapshots that no longer parse are
//! replaced with empty literals instead of forwarding malformed payloads.

use crate::coerce::{coerce_numeric, coerce_text, truncate_chars};
use crate::record::wire_number;
use crate::registry::{FieldClass, FieldId};
use serde_json::{Map, Value, json};

/// Hard ceiling applied to every text value regardless of the field's own cap.
const TEXT_CEILING: usize = 10_000;

pub fn sanitize_wire(record: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();

    for (key, entry) in record {
        let Some(id) = key.parse::<u16>().ok().and_then(FieldId::from_raw) else {
            tracing::warn!(field = %key, "dropping field not present in registry");
            continue;
        };

        let value = entry.get("value").cloned().unwrap_or(Value::Null);
        if value.is_null() {
            tracing::warn!(field = %key, "dropping null-valued field");
            continue;
        }

        let repaired = match id.spec().class {
            FieldClass::Numeric => wire_number(coerce_numeric(&value, 0.0)),
            FieldClass::Boolean => Value::Bool(value.as_bool().unwrap_or(false)),
            FieldClass::Text | FieldClass::Json => {
                Value::String(repair_text(&value, id))
            }
        };

        out.insert(key, json!({ "value": repaired }));
    }

    out
}

fn repair_text(value: &Value, id: FieldId) -> String {
    let text = coerce_text(value, id.spec().text_default, TEXT_CEILING);
    let text = truncate_chars(&text, TEXT_CEILING).to_string();

    // Values that look like embedded JSON must stay parseable downstream.
    let replacement = match text.chars().next() {
        Some('{') => "{}",
        Some('[') => "[]",
        _ => return text,
    };

    if serde_json::from_str::<Value>(&text).is_ok() {
        text
    } else {
        tracing::warn!(field = id.raw(), "replacing malformed embedded JSON");
        replacement.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(value: Value) -> Value {
        json!({ "value": value })
    }

    #[test]
    fn unknown_field_ids_are_dropped() {
        let mut record = Map::new();
        record.insert("9999".to_string(), entry(json!("x")));
        record.insert("6".to_string(), entry(json!("d1")));

        let out = sanitize_wire(record);
        assert!(!out.contains_key("9999"));
        assert_eq!(out["6"], entry(json!("d1")));
    }

    #[test]
    fn null_values_are_dropped_not_defaulted() {
        let mut record = Map::new();
        record.insert("46".to_string(), entry(Value::Null));

        let out = sanitize_wire(record);
        assert!(!out.contains_key("46"));
    }

    #[test]
    fn malformed_embedded_json_is_replaced() {
        let mut record = Map::new();
        // a truncated arrays snapshot that no longer parses
        record.insert("29".to_string(), entry(json!("[{\"module\": {\"cou")));
        record.insert("10".to_string(), entry(json!("{\"design\": {\"desi")));

        let out = sanitize_wire(record);
        assert_eq!(out["29"], entry(json!("[]")));
        assert_eq!(out["10"], entry(json!("{}")));
    }

    #[test]
    fn valid_embedded_json_passes_through() {
        let mut record = Map::new();
        record.insert("73".to_string(), entry(json!("[{\"sku\": \"MOD-1\"}]")));

        let out = sanitize_wire(record);
        assert_eq!(out["73"], entry(json!("[{\"sku\": \"MOD-1\"}]")));
    }

    #[test]
    fn non_numeric_numerics_become_zero() {
        let mut record = Map::new();
        record.insert("20".to_string(), entry(json!("twenty")));

        let out = sanitize_wire(record);
        assert_eq!(out["20"], entry(json!(0)));
    }

    #[test]
    fn text_is_clamped_to_the_hard_ceiling() {
        let mut record = Map::new();
        record.insert("46".to_string(), entry(json!("x".repeat(20_000))));

        let out = sanitize_wire(record);
        let Value::String(text) = &out["46"]["value"] else {
            panic!("expected text");
        };
        assert_eq!(text.chars().count(), TEXT_CEILING);
    }
}
