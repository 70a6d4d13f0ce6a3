use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use pulsr_http::{HttpClient, HttpRequest, HttpResponse, TransportErrorKind};

use crate::config::{ClientConfig, RequestDef};
use crate::error::{Error, Result};
use crate::query::query_string;

/// Result of one fired call, transport failures included.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// `None` means the call failed before a status line was read.
    pub status: Option<u16>,
    pub body: Bytes,
    pub latency_ms: u64,
    /// Set when the call failed at the transport level.
    pub transport_error_kind: Option<TransportErrorKind>,
    /// Error message for calls that failed at the transport or build level.
    pub error: Option<String>,
}

impl ExecutionOutcome {
    /// Only a plain 200 counts as success; every other status and every
    /// transport failure is a failure.
    pub fn is_success(&self) -> bool {
        self.status == Some(200)
    }

    /// Status column value for raw report rows: the numeric status, the
    /// transport-failure kind, or `0` for calls that failed before reaching
    /// the transport (e.g. payload serialization).
    pub fn status_label(&self) -> String {
        match (self.status, self.transport_error_kind) {
            (Some(status), _) => status.to_string(),
            (None, Some(kind)) => kind.to_string(),
            (None, None) => "0".to_string(),
        }
    }
}

/// Builds and sends one HTTP call per invocation. Holds no mutable state, so
/// one executor is shared by all concurrent executions.
#[derive(Debug)]
pub struct RequestExecutor {
    client: HttpClient,
    config: Arc<ClientConfig>,
    request_timeout: Option<Duration>,
}

impl RequestExecutor {
    pub fn new(
        client: HttpClient,
        config: Arc<ClientConfig>,
        request_timeout: Option<Duration>,
    ) -> Self {
        Self {
            client,
            config,
            request_timeout,
        }
    }

    pub fn build_url(&self, def: &RequestDef) -> String {
        format!(
            "{}/{}{}",
            self.config.base_url,
            def.api,
            query_string(&def.query_params)
        )
    }

    /// All configured cookies joined as `k1=v1; k2=v2`. Empty when no cookies
    /// are configured.
    pub fn cookie_header(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.config.cookies {
            if !out.is_empty() {
                out.push_str("; ");
            }
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out
    }

    fn build_request(&self, def: &RequestDef) -> Result<HttpRequest> {
        // The cookie header is always set, empty value included, matching the
        // wire shape of the config contract.
        let mut req = HttpRequest::new(def.method.clone(), self.build_url(def))
            .with_header("content-type", "application/json".to_string())
            .with_header("authorization", format!("Bearer {}", self.config.api_key))
            .with_header("cookie", self.cookie_header())
            .with_timeout(self.request_timeout);

        if let Some(payload) = &def.payload {
            req = req.with_body(Bytes::from(serde_json::to_vec(payload)?));
        }

        Ok(req)
    }

    async fn fire(&self, def: &RequestDef) -> Result<HttpResponse> {
        let req = self.build_request(def)?;
        Ok(self.client.request(req).await?)
    }

    /// Fires one call and folds every failure mode into the outcome, so the
    /// dispatcher records errored executions through the same path as
    /// successful ones.
    pub async fn execute(&self, def: &RequestDef) -> ExecutionOutcome {
        let started = Instant::now();
        let result = self.fire(def).await;
        let latency_ms = started.elapsed().as_millis().min(u64::MAX as u128) as u64;

        match result {
            Ok(resp) => ExecutionOutcome {
                status: Some(resp.status),
                body: resp.body,
                latency_ms,
                transport_error_kind: None,
                error: None,
            },
            Err(err) => {
                let transport_error_kind = match &err {
                    Error::Http(err) => Some(err.transport_error_kind()),
                    _ => None,
                };
                ExecutionOutcome {
                    status: None,
                    body: Bytes::new(),
                    latency_ms,
                    transport_error_kind,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
