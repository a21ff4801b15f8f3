//! Quickbase records API client.

use crate::{ClientError, RecordSink};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use url::Url;

/// Connection options for the target table. Passed in explicitly; never
/// read from ambient global state.
#[derive(Clone, Debug)]
pub struct QuickbaseConfig {
    pub api_url: Url,
    pub realm: String,
    pub user_token: String,
    pub table_id: String,
    /// Field id used as the upsert merge key (the design id column).
    pub merge_field_id: u16,
}

#[derive(Clone)]
pub struct QuickbaseClient {
    client: reqwest::Client,
    config: QuickbaseConfig,
}

impl QuickbaseClient {
    pub fn new(config: QuickbaseConfig) -> Self {
        QuickbaseClient {
            client: reqwest::Client::new(),
            config,
        }
    }
}

/// Success requires at least one confirmed row back from the API. A partial
/// success that confirms no rows counts as failure.
fn upsert_succeeded(payload: &Value) -> bool {
    let confirmed_rows = payload
        .get("data")
        .and_then(Value::as_array)
        .map_or(0, |rows| rows.len());

    if confirmed_rows == 0 {
        return false;
    }

    if let Some(line_errors) = payload
        .get("metadata")
        .and_then(|m| m.get("lineErrors"))
        .filter(|e| !e.is_null())
    {
        tracing::warn!(line_errors = %line_errors, "upsert reported line errors");
    }

    true
}

#[async_trait]
impl RecordSink for QuickbaseClient {
    async fn upsert_record(&self, record: Map<String, Value>) -> Result<bool, ClientError> {
        let url = format!(
            "{}/v1/records",
            self.config.api_url.as_str().trim_end_matches('/')
        );
        let body = json!({
            "to": self.config.table_id,
            "data": [record],
            "mergeFieldId": self.config.merge_field_id,
            "fieldsToReturn": [self.config.merge_field_id],
        });

        let response = self
            .client
            .post(&url)
            .header("QB-Realm-Hostname", &self.config.realm)
            .header(
                "Authorization",
                format!("QB-USER-TOKEN {}", self.config.user_token),
            )
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, table = %self.config.table_id, "upsert rejected");
            return Ok(false);
        }

        let payload: Value = response.json().await?;
        Ok(upsert_succeeded(&payload))
    }
}
