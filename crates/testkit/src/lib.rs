use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

pub fn string_attr(key: &str, value: &str) -> Value {
    json!({"key": key, "value": {"stringValue": value}})
}

pub fn logs_payload(service: &str, records: Vec<Value>) -> Value {
    json!({
        "resourceLogs": [{
            "resource": {"attributes": [string_attr("service.name", service)]},
            "scopeLogs": [{"scope": {"name": "testkit"}, "logRecords": records}]
        }]
    })
}

pub fn spans_payload(service: &str, spans: Vec<Value>) -> Value {
    json!({
        "resourceSpans": [{
            "resource": {"attributes": [string_attr("service.name", service)]},
            "scopeSpans": [{"scope": {"name": "testkit"}, "spans": spans}]
        }]
    })
}

pub fn log_record(severity_text: &str, severity_number: i64, body: &str) -> Value {
    json!({
        "timeUnixNano": "1704067200000000000",
        "severityText": severity_text,
        "severityNumber": severity_number,
        "body": {"stringValue": body},
        "traceId": "4bf92f3577b34da6a3ce929d0e0e4736",
        "spanId": "00f067aa0ba902b7"
    })
}

pub fn span(name: &str, start_nanos: &str, end_nanos: &str) -> Value {
    json!({
        "traceId": "4bf92f3577b34da6a3ce929d0e0e4736",
        "spanId": "00f067aa0ba902b7",
        "name": name,
        "startTimeUnixNano": start_nanos,
        "endTimeUnixNano": end_nanos,
        "status": {"code": 0}
    })
}

/// One INFO and one ERROR record from service `api`.
pub fn sample_logs_response() -> Value {
    logs_payload(
        "api",
        vec![
            log_record("INFO", 9, "request served"),
            log_record("ERROR", 17, "context deadline exceeded"),
        ],
    )
}

/// A 50ms span followed by a 200ms span from service `api`.
pub fn sample_spans_response() -> Value {
    spans_payload(
        "api",
        vec![
            span("GET /v1/orders", "1000000000", "1050000000"),
            span("cache.get redis", "2000000000", "2200000000"),
        ],
    )
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: Arc<String>,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

/// In-process upstream that answers every request with one canned response
/// and records what it was sent.
pub struct MockUpstream {
    base_url: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    task: JoinHandle<()>,
}

impl MockUpstream {
    pub async fn start(status: u16, response: Value) -> anyhow::Result<Self> {
        Self::start_raw(status, response.to_string()).await
    }

    pub async fn start_raw(status: u16, body: impl Into<String>) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status: StatusCode::from_u16(status)?,
            body: Arc::new(body.into()),
            captured: captured.clone(),
        };

        let app = Router::new().fallback(handle).with_state(state);
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            captured,
            task,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().expect("capture mutex poisoned").clone()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let captured = CapturedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    state
        .captured
        .lock()
        .expect("capture mutex poisoned")
        .push(captured);

    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body.as_str().to_string(),
    )
}
