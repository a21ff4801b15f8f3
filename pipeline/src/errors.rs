use thiserror::Error;

/// Errors raised while building a record from a design document.
///
/// Per-unit problems (a malformed array group or BOM line) are handled
/// inside the aggregator and never surface here; these variants cover
/// whole-record failures, which the pipeline answers with a minimal
/// fallback record instead of propagating.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("design document is missing the design object")]
    MissingDesign,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
