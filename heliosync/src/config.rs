//! Service configuration.
//!
//! Loaded from a YAML file; secrets may be supplied through the environment
//! instead of the file (`AURORA_API_KEY`, `QUICKBASE_TOKEN`,
//! `QUICKBASE_TABLE_ID`). After loading, all options travel inside this
//! structure into the client constructors; nothing reads the environment at
//! request time.

use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    Load(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("listener port cannot be 0")]
    InvalidPort,

    #[error("aurora tenant_id is empty")]
    EmptyTenantId,

    #[error("quickbase table_id is empty")]
    EmptyTableId,

    #[error("processing max_inflight cannot be 0")]
    ZeroInflight,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AuroraSection {
    pub base_url: Url,
    pub tenant_id: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuickbaseSection {
    #[serde(default = "default_quickbase_api_url")]
    pub api_url: Url,
    pub realm: String,
    #[serde(default)]
    pub user_token: String,
    #[serde(default)]
    pub table_id: String,
    /// Field id used as the upsert merge key (the design id column).
    #[serde(default = "default_merge_field_id")]
    pub merge_field_id: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProcessingSection {
    /// Delay between design fetches when one event fans out to many designs.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
    /// Maximum number of events processing concurrently.
    #[serde(default = "default_max_inflight")]
    pub max_inflight: usize,
}

impl Default for ProcessingSection {
    fn default() -> Self {
        ProcessingSection {
            pacing_ms: default_pacing_ms(),
            max_inflight: default_max_inflight(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub listener: Listener,
    pub aurora: AuroraSection,
    pub quickbase: QuickbaseSection,
    #[serde(default)]
    pub processing: ProcessingSection,
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

fn default_quickbase_api_url() -> Url {
    Url::parse("https://api.quickbase.com").expect("static URL")
}

fn default_merge_field_id() -> u16 {
    6
}

fn default_pacing_ms() -> u64 {
    700
}

fn default_max_inflight() -> usize {
    8
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let mut config: Config = serde_yaml::from_reader(file)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Secret overrides; the lookup is injected so tests need not mutate the
    /// process environment.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("AURORA_API_KEY") {
            self.aurora.api_key = key;
        }
        if let Some(token) = lookup("QUICKBASE_TOKEN") {
            self.quickbase.user_token = token;
        }
        if let Some(table_id) = lookup("QUICKBASE_TABLE_ID") {
            self.quickbase.table_id = table_id;
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.listener.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        if self.aurora.tenant_id.is_empty() {
            return Err(ValidationError::EmptyTenantId);
        }
        if self.quickbase.table_id.is_empty() {
            return Err(ValidationError::EmptyTableId);
        }
        if self.processing.max_inflight == 0 {
            return Err(ValidationError::ZeroInflight);
        }
        Ok(())
    }
}
