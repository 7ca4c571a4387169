use serde::{Deserialize, Serialize};
use serde_json::Value;

use telq_core::ApiError;
use telq_core::model::{FlatLog, FlatSpan};
use telq_core::query::{LogQuery, QueryEnvelope, SpanQuery};
use telq_query::{QueryEngine, QueryExecutor};

/// One query operation, shared by the CLI, replay handles and MCP tools.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ApiRequest {
    QueryLogs(LogQuery),
    QuerySpans(SpanQuery),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ApiResponse {
    Logs(QueryEnvelope<FlatLog>),
    Spans(QueryEnvelope<FlatSpan>),
    Error(ApiError),
}

impl ApiRequest {
    /// Map an MCP tool call onto a request; `None` for an unknown tool.
    pub fn from_tool_call(name: &str, args: &Value) -> Option<Self> {
        match name {
            "query_logs" => Some(Self::QueryLogs(LogQuery::from_args(args))),
            "query_spans" => Some(Self::QuerySpans(SpanQuery::from_args(args))),
            _ => None,
        }
    }
}

pub async fn execute<E: QueryExecutor>(engine: &QueryEngine<E>, req: &ApiRequest) -> ApiResponse {
    let result = match req {
        ApiRequest::QueryLogs(q) => engine.query_logs(q).await.map(ApiResponse::Logs),
        ApiRequest::QuerySpans(q) => engine.query_spans(q).await.map(ApiResponse::Spans),
    };
    result.unwrap_or_else(ApiResponse::Error)
}
