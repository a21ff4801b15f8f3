//! Webhook ingest service: accepts "design completed" events and relays the
//! transformed records to the target table in the background.

pub mod dispatch;
pub mod errors;
pub mod event;
pub mod metrics_defs;
pub mod processor;
pub mod service;

pub use dispatch::Dispatcher;
pub use errors::WebhookError;
pub use event::WebhookEvent;
pub use processor::Processor;
pub use service::WebhookService;

use clients::{DesignSource, RecordSink};
use shared::http::run_http_service;

/// Serve the webhook endpoint until the process exits.
pub async fn run<S, K>(
    host: &str,
    port: u16,
    service: WebhookService<S, K>,
) -> Result<(), WebhookError>
where
    S: DesignSource + 'static,
    K: RecordSink + 'static,
{
    shared::metrics_defs::describe_all(metrics_defs::ALL_METRICS);
    run_http_service(host, port, service).await
}
