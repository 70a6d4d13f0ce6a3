use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::query::QueryParamSpec;

/// Shared client configuration consumed by every request execution.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Directory stage reports are written into.
    pub stats_folder: PathBuf,
    /// Currently only bearer auth is wired up; kept for config compatibility.
    pub auth_mechanism: String,
    pub api_key: String,
    /// BTreeMap so the generated Cookie header has a fixed order.
    pub cookies: BTreeMap<String, String>,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.base_url)
            .map_err(|_| Error::InvalidBaseUrl(self.base_url.clone()))?;
        Ok(())
    }
}

/// One logical API call. Immutable after configuration load.
#[derive(Debug, Clone)]
pub struct RequestDef {
    /// Path relative to the base url, without a leading slash.
    pub api: String,
    pub method: http::Method,
    pub payload: Option<serde_json::Value>,
    pub query_params: Vec<QueryParamSpec>,
}

impl RequestDef {
    /// Identity used for stats keys and report rows.
    pub fn name(&self) -> String {
        format!("{}-{}", self.method, self.api)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interval between dispatch waves.
    pub tick_interval: Duration,
    /// Upper bound on concurrently executing requests across all ticks.
    pub max_in_flight: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            max_in_flight: 64,
        }
    }
}
