//! Outbound capability clients.
//!
//! The webhook processor consumes two capabilities: a [`DesignSource`] that
//! fetches design and project documents, and a [`RecordSink`] that upserts
//! one flat record by merge key. The concrete implementations talk to the
//! Aurora Solar and Quickbase HTTP APIs; tests substitute in-memory fakes.

pub mod aurora;
pub mod quickbase;

pub use aurora::{AuroraClient, AuroraConfig};
pub use quickbase::{QuickbaseClient, QuickbaseConfig};

use async_trait::async_trait;
use serde_json::{Map, Value};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {service}")]
    UnexpectedStatus {
        service: &'static str,
        status: reqwest::StatusCode,
    },
}

/// Capability to read design data from the design service.
#[async_trait]
pub trait DesignSource: Send + Sync {
    /// Fetch a design summary envelope; `None` when the design is unknown.
    async fn fetch_design_summary(&self, design_id: &str) -> Result<Option<Value>, ClientError>;

    /// Fetch a project document; `None` when the project is unknown.
    async fn fetch_project(&self, project_id: &str) -> Result<Option<Value>, ClientError>;

    /// List the design ids attached to a project.
    async fn list_project_designs(&self, project_id: &str) -> Result<Vec<String>, ClientError>;
}

/// Capability to upsert one wire-format record into the target table.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Returns true only when the remote call confirms at least one row.
    async fn upsert_record(&self, record: Map<String, Value>) -> Result<bool, ClientError>;
}
