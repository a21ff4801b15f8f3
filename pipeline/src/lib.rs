//! Transformation pipeline: nested design documents in, flat total records
//! out.
//!
//! Data flow: raw design envelope → aggregator (derived totals and
//! first-wins selections) → record builder (full field assembly) →
//! defaulting pass (totality guarantee) → record validator (wire-map
//! hardening) → upsert capability.
//!
//! The pipeline is synchronous and stateless: a record is built fresh per
//! design event from read-only inputs, so transforming the same document
//! twice yields byte-identical wire payloads.

pub mod aggregate;
pub mod builder;
pub mod coerce;
pub mod defaults;
pub mod errors;
pub mod record;
pub mod registry;
pub mod validate;

pub use errors::TransformError;
pub use record::{FieldValue, RecordDraft, TargetRecord};
pub use registry::{FieldClass, FieldId};

use serde_json::Value;

/// Transform a design summary envelope (plus the optional project document)
/// into a complete target record.
///
/// Never fails: a whole-record build failure degrades to a minimal
/// design-id-plus-error record, and the defaulting pass then fills the rest
/// of the registry.
pub fn transform(envelope: &Value, project: Option<&Value>) -> TargetRecord {
    let draft = match builder::build_record(envelope, project) {
        Ok(draft) => draft,
        Err(err) => {
            tracing::error!(error = %err, "record build failed, emitting fallback record");
            builder::fallback_record(envelope, &err)
        }
    };
    defaults::apply_defaults(draft)
}
