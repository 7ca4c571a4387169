use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use telq_core::config::Config;
use telq_core::query::{QueryRequest, Signal};
use telq_core::{ApiError, TelqError};

use crate::detail::extract_error_detail;

/// Boundary to the upstream query API: one round trip per call.
///
/// Implementations are shared across concurrent queries and must not keep
/// per-call mutable state.
pub trait QueryExecutor: Send + Sync {
    fn execute(
        &self,
        signal: Signal,
        request: &QueryRequest,
    ) -> impl Future<Output = Result<Value, ApiError>> + Send;
}

/// HTTP executor backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    auth_token: String,
    dataset: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: impl Into<String>,
        timeout: Duration,
    ) -> telq_core::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TelqError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: auth_token.into(),
            dataset: None,
        })
    }

    pub fn from_config(cfg: &Config) -> telq_core::Result<Self> {
        cfg.validate()?;
        let client = Self::new(
            cfg.base_url.clone().unwrap_or_default(),
            cfg.auth_token.clone().unwrap_or_default(),
            cfg.request_timeout,
        )?;
        Ok(client.with_dataset(cfg.dataset.clone()))
    }

    pub fn with_dataset(mut self, dataset: Option<String>) -> Self {
        self.dataset = dataset.filter(|d| !d.is_empty());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a JSON body and normalize the outcome. Any non-2xx status is an
    /// error carrying the status line and the parsed body.
    pub async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self
            .http
            .post(&url)
            .bearer_auth(&self.auth_token)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(body);
        if let Some(dataset) = &self.dataset {
            req = req.query(&[("dataset", dataset.as_str())]);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("request failed: {e}")))?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::transport(format!("failed to read response: {e}")))?;
        let payload = parse_body(&bytes);

        if status.is_success() {
            Ok(payload)
        } else {
            Err(upstream_error(status, payload))
        }
    }
}

impl QueryExecutor for ApiClient {
    async fn execute(&self, signal: Signal, request: &QueryRequest) -> Result<Value, ApiError> {
        self.post(signal.path(), request).await
    }
}

/// JSON when the body parses, the raw text otherwise, `null` when empty.
pub fn parse_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn upstream_error(status: StatusCode, payload: Value) -> ApiError {
    ApiError {
        status_code: status.as_u16(),
        title: Some(status.to_string()),
        detail: extract_error_detail(&payload),
        payload: Some(payload).filter(|p| !p.is_null()),
    }
}
