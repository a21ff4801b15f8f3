//! Typed target record and its wire representation.
//!
//! Internally fields are keyed by [`FieldId`]; the integer-keyed
//! `{"<id>": {"value": ...}}` shape the table service expects is produced
//! only at the boundary, by [`TargetRecord::to_wire`].

use crate::registry::FieldId;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// A single field value. JSON-blob fields are carried as already-serialized
/// text, matching the size-limited text columns they land in.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl FieldValue {
    fn to_wire(&self) -> Value {
        match self {
            FieldValue::Number(n) => wire_number(*n),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Serialize a number, keeping whole values as JSON integers.
pub(crate) fn wire_number(n: f64) -> Value {
    if !n.is_finite() {
        return Value::from(0);
    }
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Value::from(n as i64);
    }
    Value::from(n)
}

/// Partially-populated record produced by the builder, before the
/// defaulting pass closes the gaps.
#[derive(Debug, Default)]
pub struct RecordDraft {
    fields: BTreeMap<FieldId, FieldValue>,
}

impl RecordDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: FieldId, value: FieldValue) {
        self.fields.insert(id, value);
    }

    pub fn set_number(&mut self, id: FieldId, value: f64) {
        self.set(id, FieldValue::Number(value));
    }

    pub fn set_text(&mut self, id: FieldId, value: impl Into<String>) {
        self.set(id, FieldValue::Text(value.into()));
    }

    pub fn set_bool(&mut self, id: FieldId, value: bool) {
        self.set(id, FieldValue::Bool(value));
    }

    pub fn contains(&self, id: FieldId) -> bool {
        self.fields.contains_key(&id)
    }

    pub fn get(&self, id: FieldId) -> Option<&FieldValue> {
        self.fields.get(&id)
    }

    pub(crate) fn into_fields(self) -> BTreeMap<FieldId, FieldValue> {
        self.fields
    }
}

/// A complete record: after the defaulting pass every registry field is
/// present exactly once. Created fresh per design event, dispatched once,
/// then discarded.
#[derive(Debug, PartialEq)]
pub struct TargetRecord {
    fields: BTreeMap<FieldId, FieldValue>,
}

impl TargetRecord {
    pub(crate) fn from_fields(fields: BTreeMap<FieldId, FieldValue>) -> Self {
        Self { fields }
    }

    pub fn get(&self, id: FieldId) -> Option<&FieldValue> {
        self.fields.get(&id)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize to the integer-keyed upsert shape.
    pub fn to_wire(&self) -> Map<String, Value> {
        let mut wire = Map::new();
        for (id, value) in &self.fields {
            wire.insert(id.raw().to_string(), json!({ "value": value.to_wire() }));
        }
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_serialize_as_integers() {
        assert_eq!(wire_number(10.0), Value::from(10));
        assert_eq!(wire_number(7.2), Value::from(7.2));
        assert_eq!(wire_number(0.0), Value::from(0));
        assert_eq!(wire_number(f64::NAN), Value::from(0));
    }

    #[test]
    fn wire_shape_is_integer_keyed() {
        let mut draft = RecordDraft::new();
        draft.set_text(FieldId::DesignId, "abc123");
        draft.set_number(FieldId::TotalModules, 24.0);
        draft.set_bool(FieldId::ProductionUpToDate, true);

        let record = TargetRecord::from_fields(draft.into_fields());
        let wire = record.to_wire();

        assert_eq!(wire["6"], json!({ "value": "abc123" }));
        assert_eq!(wire["20"], json!({ "value": 24 }));
        assert_eq!(wire["45"], json!({ "value": true }));
    }

    #[test]
    fn draft_set_overwrites() {
        let mut draft = RecordDraft::new();
        draft.set_number(FieldId::RackingQty, 4.0);
        draft.set_number(FieldId::RackingQty, 10.0);
        assert_eq!(
            draft.get(FieldId::RackingQty),
            Some(&FieldValue::Number(10.0))
        );
    }
}
