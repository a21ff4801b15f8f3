use thiserror::Error;

/// Errors surfaced by the webhook HTTP service itself.
///
/// Processing failures (fetch, transform, upsert) never reach the event
/// sender; they are logged and counted by the processor. These variants
/// cover only the inbound request/connection path.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
