//! Per-event processing: resolve design ids, fetch, transform, upsert.
//!
//! One accepted webhook event is processed synchronously on its own task:
//! design fetches fan out sequentially with a fixed pacing delay to respect
//! the design service's rate limits, and delivery to the table is
//! at-most-once — a failed upsert is logged and dropped, never retried.

use crate::event::WebhookEvent;
use crate::metrics_defs;
use clients::{ClientError, DesignSource, RecordSink};
use serde_json::Value;
use shared::counter;
use tokio::time::{Duration, sleep};

pub struct Processor<S, K> {
    source: S,
    sink: K,
    /// Delay between design fetches when one event fans out to many designs.
    pacing: Duration,
}

impl<S: DesignSource, K: RecordSink> Processor<S, K> {
    pub fn new(source: S, sink: K, pacing: Duration) -> Self {
        Processor {
            source,
            sink,
            pacing,
        }
    }

    /// Process one accepted event end to end. Never returns an error: every
    /// failure mode is logged, counted, and contained here.
    pub async fn process_event(&self, event: WebhookEvent) {
        let design_ids = match self.resolve_design_ids(&event).await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!(error = %err, project_id = ?event.project_id, "failed to list project designs");
                counter!(metrics_defs::FETCH_FAILURES).increment(1);
                return;
            }
        };

        if design_ids.is_empty() {
            tracing::warn!(project_id = ?event.project_id, "no designs found for event");
            return;
        }

        tracing::info!(count = design_ids.len(), "processing designs");

        for (index, design_id) in design_ids.iter().enumerate() {
            if index > 0 {
                sleep(self.pacing).await;
            }
            self.sync_design(&event, design_id).await;
        }
    }

    async fn resolve_design_ids(&self, event: &WebhookEvent) -> Result<Vec<String>, ClientError> {
        if let Some(design_id) = &event.design_id {
            return Ok(vec![design_id.clone()]);
        }
        if let Some(project_id) = &event.project_id {
            return self.source.list_project_designs(project_id).await;
        }
        // unreachable past the gate, but harmless
        Ok(Vec::new())
    }

    async fn sync_design(&self, event: &WebhookEvent, design_id: &str) {
        let envelope = match self.source.fetch_design_summary(design_id).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => {
                tracing::warn!(design_id, "design not found, skipping");
                counter!(metrics_defs::FETCH_FAILURES).increment(1);
                return;
            }
            Err(err) => {
                tracing::error!(design_id, error = %err, "design fetch failed, skipping");
                counter!(metrics_defs::FETCH_FAILURES).increment(1);
                return;
            }
        };

        let project = self.fetch_project_for(event, &envelope).await;
        let record = pipeline::transform(&envelope, project.as_ref());
        let wire = pipeline::validate::sanitize_wire(record.to_wire());

        match self.sink.upsert_record(wire).await {
            Ok(true) => {
                tracing::info!(design_id, "design synced");
                counter!(metrics_defs::DESIGNS_SYNCED).increment(1);
            }
            Ok(false) => {
                tracing::warn!(design_id, "upsert rejected, record dropped");
                counter!(metrics_defs::UPSERT_FAILURES).increment(1);
            }
            Err(err) => {
                tracing::error!(design_id, error = %err, "upsert call failed, record dropped");
                counter!(metrics_defs::UPSERT_FAILURES).increment(1);
            }
        }
    }

    /// Project id comes from the event, falling back to the design document.
    /// A failed project fetch degrades to an anonymous record instead of
    /// skipping the design.
    async fn fetch_project_for(&self, event: &WebhookEvent, envelope: &Value) -> Option<Value> {
        let project_id = event.project_id.clone().or_else(|| {
            envelope
                .get("design")
                .and_then(|design| design.get("project_id"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })?;

        match self.source.fetch_project(&project_id).await {
            Ok(project) => project,
            Err(err) => {
                tracing::warn!(project_id, error = %err, "project fetch failed, continuing without customer data");
                None
            }
        }
    }
}
