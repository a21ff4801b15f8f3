//! Defaulting pass: closes every gap the builder left.
//!
//! Runs after the record builder so populated values are never overwritten.
//! Afterwards the record is total: every registry field has a value, no
//! matter how sparse the source document was.

use crate::record::{RecordDraft, TargetRecord};
use crate::registry::REGISTRY;

pub fn apply_defaults(draft: RecordDraft) -> TargetRecord {
    let mut fields = draft.into_fields();
    for spec in REGISTRY {
        fields
            .entry(spec.id)
            .or_insert_with(|| spec.default_value());
    }
    TargetRecord::from_fields(fields)
}
