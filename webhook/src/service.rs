//! The inbound webhook HTTP service.
//!
//! Three routes: `/` (service descriptor), `/health`, and `/webhook`
//! (GET with query parameters or POST with a JSON body). The sender only
//! ever sees an immediate accepted/skipped/rejected acknowledgment; all
//! processing happens on background tasks after the response is sent.

use crate::dispatch::Dispatcher;
use crate::errors::WebhookError;
use crate::event::{Gate, WebhookEvent};
use crate::metrics_defs;
use crate::processor::Processor;
use clients::{DesignSource, RecordSink};
use http_body_util::{BodyExt, combinators::BoxBody};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{Value, json};
use shared::counter;
use shared::http::{json_response, make_error_response};
use std::pin::Pin;
use std::sync::Arc;

type WebhookResponse = Response<BoxBody<Bytes, WebhookError>>;

pub struct WebhookService<S, K> {
    processor: Arc<Processor<S, K>>,
    dispatcher: Dispatcher,
}

impl<S, K> WebhookService<S, K> {
    pub fn new(processor: Processor<S, K>, dispatcher: Dispatcher) -> Self {
        WebhookService {
            processor: Arc::new(processor),
            dispatcher,
        }
    }
}

impl<S, K> Service<Request<Incoming>> for WebhookService<S, K>
where
    S: DesignSource + 'static,
    K: RecordSink + 'static,
{
    type Response = WebhookResponse;
    type Error = WebhookError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let processor = self.processor.clone();
        let dispatcher = self.dispatcher.clone();

        Box::pin(async move {
            match (req.method(), req.uri().path()) {
                (&Method::GET, "/") => Ok(json_response(
                    StatusCode::OK,
                    &json!({
                        "service": "heliosync",
                        "status": "running",
                        "endpoints": {"webhook": "/webhook", "health": "/health"},
                    }),
                )),
                (&Method::GET, "/health") => Ok(json_response(
                    StatusCode::OK,
                    &json!({"status": "healthy"}),
                )),
                (&Method::GET | &Method::POST, "/webhook") => {
                    handle_webhook(req, processor, dispatcher).await
                }
                _ => Ok(make_error_response(StatusCode::NOT_FOUND)),
            }
        })
    }
}

async fn handle_webhook<S, K>(
    req: Request<Incoming>,
    processor: Arc<Processor<S, K>>,
    dispatcher: Dispatcher,
) -> Result<WebhookResponse, WebhookError>
where
    S: DesignSource + 'static,
    K: RecordSink + 'static,
{
    let event = parse_event(req).await?;
    tracing::info!(?event, "received webhook");
    counter!(metrics_defs::EVENTS_RECEIVED).increment(1);

    match event.gate() {
        Gate::Reject => {
            counter!(metrics_defs::EVENTS_REJECTED).increment(1);
            Ok(json_response(
                StatusCode::BAD_REQUEST,
                &json!({"status": "rejected", "reason": "missing design_id or project_id"}),
            ))
        }
        Gate::SkipStage => {
            tracing::info!(stage = ?event.stage, "stage gate skipped event");
            counter!(metrics_defs::EVENTS_SKIPPED).increment(1);
            Ok(json_response(
                StatusCode::OK,
                &json!({"status": "skipped", "reason": "stage is not installed"}),
            ))
        }
        Gate::Accept => {
            // acknowledge first; processing is observable only through logs
            dispatcher.spawn(async move { processor.process_event(event).await });
            Ok(json_response(
                StatusCode::OK,
                &json!({"status": "accepted"}),
            ))
        }
    }
}

async fn parse_event(req: Request<Incoming>) -> Result<WebhookEvent, WebhookError> {
    if req.method() == Method::GET {
        return Ok(WebhookEvent::from_query(req.uri().query().unwrap_or("")));
    }

    let body = req
        .into_body()
        .collect()
        .await
        .map_err(|e| WebhookError::RequestBody(e.to_string()))?
        .to_bytes();

    if body.is_empty() {
        return Ok(WebhookEvent::default());
    }

    match serde_json::from_slice::<Value>(&body) {
        Ok(value) => Ok(WebhookEvent::from_json(&value)),
        Err(err) => {
            // treated like an empty event; the gate rejects it
            tracing::warn!(error = %err, "unparseable webhook body");
            Ok(WebhookEvent::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clients::ClientError;
    use serde_json::Map;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::net::TcpListener;
    use tokio::time::{Duration, sleep};

    struct FakeSource {
        designs: HashMap<String, Value>,
    }

    #[async_trait]
    impl DesignSource for FakeSource {
        async fn fetch_design_summary(
            &self,
            design_id: &str,
        ) -> Result<Option<Value>, ClientError> {
            Ok(self.designs.get(design_id).cloned())
        }

        async fn fetch_project(&self, _project_id: &str) -> Result<Option<Value>, ClientError> {
            Ok(None)
        }

        async fn list_project_designs(
            &self,
            _project_id: &str,
        ) -> Result<Vec<String>, ClientError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        records: Arc<Mutex<Vec<Map<String, Value>>>>,
    }

    #[async_trait]
    impl RecordSink for FakeSink {
        async fn upsert_record(&self, record: Map<String, Value>) -> Result<bool, ClientError> {
            self.records.lock().unwrap().push(record);
            Ok(true)
        }
    }

    async fn start_service() -> (String, Arc<Mutex<Vec<Map<String, Value>>>>) {
        let source = FakeSource {
            designs: HashMap::from([(
                "d1".to_string(),
                json!({"design": {"design_id": "d1", "system_size_stc": 7200}}),
            )]),
        };
        let sink = FakeSink::default();
        let records = sink.records.clone();

        let service = WebhookService::new(
            Processor::new(source, sink, Duration::ZERO),
            Dispatcher::new(4),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = shared::http::serve_connections(listener, service).await;
        });

        (format!("http://{addr}"), records)
    }

    async fn wait_for_records(
        records: &Arc<Mutex<Vec<Map<String, Value>>>>,
        expected: usize,
    ) -> usize {
        for _ in 0..50 {
            let len = records.lock().unwrap().len();
            if len >= expected {
                return len;
            }
            sleep(Duration::from_millis(10)).await;
        }
        records.lock().unwrap().len()
    }

    #[tokio::test]
    async fn health_endpoint_answers() {
        let (base, _records) = start_service().await;
        let response = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn accepted_post_reaches_the_sink() {
        let (base, records) = start_service().await;

        let response = reqwest::Client::new()
            .post(format!("{base}/webhook"))
            .json(&json!({"design_id": "d1", "stage": "installed"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "accepted");

        assert_eq!(wait_for_records(&records, 1).await, 1);
        assert_eq!(records.lock().unwrap()[0]["6"]["value"], json!("d1"));
    }

    #[tokio::test]
    async fn get_with_query_parameters_is_accepted() {
        let (base, records) = start_service().await;

        let response = reqwest::get(format!("{base}/webhook?design_id=d1&stage=Installed"))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        assert_eq!(wait_for_records(&records, 1).await, 1);
    }

    #[tokio::test]
    async fn non_installed_stage_is_skipped() {
        let (base, records) = start_service().await;

        let response = reqwest::Client::new()
            .post(format!("{base}/webhook"))
            .json(&json!({"design_id": "d1", "stage": "proposal"}))
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "skipped");

        // give any stray task a moment, then confirm nothing was dispatched
        sleep(Duration::from_millis(50)).await;
        assert!(records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_event_is_rejected() {
        let (base, _records) = start_service().await;

        let response = reqwest::Client::new()
            .post(format!("{base}/webhook"))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (base, _records) = start_service().await;
        let response = reqwest::get(format!("{base}/nope")).await.unwrap();
        assert_eq!(response.status(), 404);
    }
}
