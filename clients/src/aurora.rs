//! Aurora Solar API client.

use crate::{ClientError, DesignSource};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Connection options for the design service. Passed in explicitly; never
/// read from ambient global state.
#[derive(Clone, Debug)]
pub struct AuroraConfig {
    pub base_url: Url,
    pub tenant_id: String,
    pub api_key: String,
}

#[derive(Clone)]
pub struct AuroraClient {
    client: reqwest::Client,
    config: AuroraConfig,
}

#[derive(Deserialize)]
struct ProjectDesignsResponse {
    #[serde(default)]
    designs: Vec<DesignRef>,
}

#[derive(Deserialize)]
struct DesignRef {
    design_id: Option<String>,
}

impl AuroraClient {
    pub fn new(config: AuroraConfig) -> Self {
        AuroraClient {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn tenant_url(&self, suffix: &str) -> String {
        format!(
            "{}/tenants/{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            self.config.tenant_id,
            suffix
        )
    }

    /// GET a tenant-scoped resource; 404 maps to `None`.
    async fn get_json(&self, url: String) -> Result<Option<Value>, ClientError> {
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(ClientError::UnexpectedStatus {
                service: "aurora",
                status,
            }),
        }
    }
}

#[async_trait]
impl DesignSource for AuroraClient {
    async fn fetch_design_summary(&self, design_id: &str) -> Result<Option<Value>, ClientError> {
        self.get_json(self.tenant_url(&format!("designs/{design_id}/summary")))
            .await
    }

    async fn fetch_project(&self, project_id: &str) -> Result<Option<Value>, ClientError> {
        self.get_json(self.tenant_url(&format!("projects/{project_id}")))
            .await
    }

    async fn list_project_designs(&self, project_id: &str) -> Result<Vec<String>, ClientError> {
        let url = self.tenant_url(&format!("projects/{project_id}/designs"));
        let Some(payload) = self.get_json(url).await? else {
            return Ok(Vec::new());
        };

        let parsed: ProjectDesignsResponse =
            serde_json::from_value(payload).unwrap_or(ProjectDesignsResponse { designs: vec![] });
        Ok(parsed
            .designs
            .into_iter()
            .filter_map(|d| d.design_id)
            .collect())
    }
}
