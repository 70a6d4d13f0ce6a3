use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr as _;

use anyhow::Context as _;
use serde::Deserialize;

use pulsr_core::{ClientConfig, QueryParamSpec, RequestDef};

#[derive(Debug, Deserialize)]
pub(crate) struct ConfigFile {
    pub config: ClientJson,
    #[serde(default)]
    pub requests: Vec<RequestJson>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClientJson {
    pub base_url: String,
    pub stats_folder: PathBuf,

    /// Currently only bearer auth exists; kept for config compatibility.
    #[serde(default)]
    pub auth_mechanism: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequestJson {
    pub api: String,
    pub method: String,

    #[serde(default)]
    pub payload: Option<serde_json::Value>,

    #[serde(default)]
    pub query_params: Vec<QueryParamJson>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueryParamJson {
    pub key: String,
    pub value_type: String,
    pub value: String,
}

impl ConfigFile {
    pub(crate) fn into_core(self) -> anyhow::Result<(ClientConfig, Vec<RequestDef>)> {
        let client = ClientConfig {
            base_url: self.config.base_url,
            stats_folder: self.config.stats_folder,
            auth_mechanism: self.config.auth_mechanism,
            api_key: self.config.api_key,
            cookies: self.config.cookies,
        };
        client.validate()?;

        let mut requests = Vec::with_capacity(self.requests.len());
        for req in self.requests {
            let method = http::Method::from_str(&req.method.to_ascii_uppercase())
                .with_context(|| format!("invalid method `{}` for api `{}`", req.method, req.api))?;
            requests.push(RequestDef {
                api: req.api,
                method,
                payload: req.payload,
                query_params: req
                    .query_params
                    .into_iter()
                    .map(|p| QueryParamSpec {
                        key: p.key,
                        value_type: p.value_type,
                        value: p.value,
                    })
                    .collect(),
            });
        }

        Ok((client, requests))
    }
}

pub(crate) async fn load(path: &Path) -> anyhow::Result<(ClientConfig, Vec<RequestDef>)> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let parsed: ConfigFile = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    parsed.into_core()
}
