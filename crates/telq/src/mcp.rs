//! Newline-delimited JSON-RPC server speaking the MCP tool protocol.

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use telq_query::{QueryEngine, QueryExecutor};

use crate::protocol::{ApiRequest, ApiResponse, execute};

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct McpReq {
    id: Option<Value>,
    method: Option<String>,
    params: Option<Value>,
}

fn mcp_ok(id: Option<Value>, result: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "result": result})
}

fn mcp_err(id: Option<Value>, code: i64, message: impl Into<String>) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message.into()}})
}

/// Serves tool calls against one engine. When the upstream could not be
/// configured, protocol methods still work and every tool call reports why.
pub struct McpServer<E> {
    engine: Result<QueryEngine<E>, String>,
}

impl<E: QueryExecutor> McpServer<E> {
    pub fn new(engine: Result<QueryEngine<E>, String>) -> Self {
        Self { engine }
    }

    pub async fn serve_stdio(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(reply) = self.handle_line(&line).await {
                println!("{}", serde_json::to_string(&reply)?);
            }
        }
        Ok(())
    }

    /// Answer one input line. Notifications (no `id`) get no reply.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        let input: McpReq = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => return Some(mcp_err(None, PARSE_ERROR, e.to_string())),
        };
        let id = input.id?;
        let method = input.method.unwrap_or_default();
        debug!(%method, "mcp request");

        let reply = match method.as_str() {
            "initialize" => mcp_ok(Some(id), initialize_result()),
            "ping" => mcp_ok(Some(id), json!({})),
            "tools/list" => mcp_ok(Some(id), json!({"tools": tool_definitions()})),
            "tools/call" => self.call_tool(id, input.params.unwrap_or(Value::Null)).await,
            _ => mcp_err(
                Some(id),
                METHOD_NOT_FOUND,
                "unsupported method (expected initialize, ping, tools/list, tools/call)",
            ),
        };
        Some(reply)
    }

    async fn call_tool(&self, id: Value, params: Value) -> Value {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return mcp_err(Some(id), INVALID_PARAMS, "missing tool name");
        };
        let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
        let Some(request) = ApiRequest::from_tool_call(name, &args) else {
            return mcp_err(Some(id), INVALID_PARAMS, format!("unknown tool: {name}"));
        };

        let engine = match &self.engine {
            Ok(engine) => engine,
            Err(reason) => return mcp_ok(Some(id), tool_text(reason.clone(), true)),
        };

        let result = match execute(engine, &request).await {
            ApiResponse::Logs(env) => to_text(&env, false),
            ApiResponse::Spans(env) => to_text(&env, false),
            ApiResponse::Error(err) => to_text(&err, true),
        };
        mcp_ok(Some(id), result)
    }
}

fn to_text<T: serde::Serialize>(value: &T, is_error: bool) -> Value {
    match serde_json::to_string_pretty(value) {
        Ok(text) => tool_text(text, is_error),
        Err(e) => tool_text(format!("failed to encode result: {e}"), true),
    }
}

fn tool_text(text: String, is_error: bool) -> Value {
    let mut result = json!({"content": [{"type": "text", "text": text}]});
    if is_error {
        result["isError"] = Value::Bool(true);
    }
    result
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {"name": "telq", "version": env!("CARGO_PKG_VERSION")},
        "capabilities": {
            "tools": {"listChanged": false}
        }
    })
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "query_logs",
            "description": "Query log records in a recent time window. Filters by service upstream; minimum severity and body substring are applied to the returned page.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "service_name": {"type": "string", "description": "Only records from this service (service.name)"},
                    "time_range_minutes": {"type": "number", "description": "Lookback in minutes (default 60, max 1440)"},
                    "min_severity": {"type": "string", "enum": ["TRACE", "DEBUG", "INFO", "WARN", "ERROR", "FATAL"]},
                    "body_contains": {"type": "string", "description": "Case-insensitive substring of the log body"},
                    "limit": {"type": "integer", "description": "Maximum records (default 100, max 500)"}
                }
            }
        },
        {
            "name": "query_spans",
            "description": "Query spans in a recent time window, filtered by service, HTTP attributes, name or error status.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "service_name": {"type": "string", "description": "Only spans from this service (service.name)"},
                    "time_range_minutes": {"type": "number", "description": "Lookback in minutes (default 60, max 1440)"},
                    "http_method": {"type": "string", "description": "http.request.method, e.g. GET"},
                    "http_status_code": {"type": "integer", "description": "http.response.status_code"},
                    "span_name": {"type": "string"},
                    "error_only": {"type": "boolean", "description": "Only spans with error status"},
                    "min_duration_ms": {"type": "number", "description": "Only spans at least this long"},
                    "limit": {"type": "integer", "description": "Maximum spans (default 100, max 200)"}
                }
            }
        }
    ])
}
