use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::{AttributeFilter, Severity, TimeWindow};

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LOG_LIMIT: usize = 500;
pub const MAX_SPAN_LIMIT: usize = 200;

/// Record kind served by an upstream query endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Logs,
    Spans,
}

impl Signal {
    pub fn path(self) -> &'static str {
        match self {
            Self::Logs => "/api/logs",
            Self::Spans => "/api/spans",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logs => "logs",
            Self::Spans => "spans",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LogQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_severity: Option<Severity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_contains: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl LogQuery {
    /// Read tool arguments leniently: mistyped or empty values count as absent.
    pub fn from_args(args: &Value) -> Self {
        Self {
            service_name: arg_str(args, "service_name"),
            time_range_minutes: arg_f64(args, "time_range_minutes"),
            min_severity: arg_str(args, "min_severity").and_then(|s| s.parse().ok()),
            body_contains: arg_str(args, "body_contains"),
            limit: arg_limit(args),
        }
    }

    pub fn effective_limit(&self) -> usize {
        clamp_limit(self.limit, MAX_LOG_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SpanQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range_minutes: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_name: Option<String>,
    pub error_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SpanQuery {
    pub fn from_args(args: &Value) -> Self {
        Self {
            service_name: arg_str(args, "service_name"),
            time_range_minutes: arg_f64(args, "time_range_minutes"),
            http_method: arg_str(args, "http_method"),
            http_status_code: arg_f64(args, "http_status_code").map(|v| v as i64),
            span_name: arg_str(args, "span_name"),
            error_only: args
                .get("error_only")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            min_duration_ms: arg_f64(args, "min_duration_ms"),
            limit: arg_limit(args),
        }
    }

    pub fn effective_limit(&self) -> usize {
        clamp_limit(self.limit, MAX_SPAN_LIMIT)
    }
}

fn clamp_limit(requested: Option<usize>, max: usize) -> usize {
    match requested {
        Some(limit) if limit > 0 => limit.min(max),
        _ => DEFAULT_LIMIT,
    }
}

fn arg_str(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn arg_f64(args: &Value, key: &str) -> Option<f64> {
    args.get(key).and_then(Value::as_f64)
}

fn arg_limit(args: &Value) -> Option<usize> {
    arg_f64(args, "limit")
        .filter(|l| *l >= 1.0)
        .map(|l| l.min(usize::MAX as f64) as usize)
}

/// Body sent to an upstream query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub time_range: TimeWindow,
    pub filter: Vec<AttributeFilter>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub limit: usize,
}

/// Echo of what was asked of the upstream: only push-down filters appear
/// here, never the client-side ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryEcho {
    pub time_range: TimeWindow,
    pub filters: Vec<AttributeFilter>,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryEnvelope<R> {
    pub records: Vec<R>,
    pub count: usize,
    pub query: QueryEcho,
}

impl<R> QueryEnvelope<R> {
    pub fn new(records: Vec<R>, query: QueryEcho) -> Self {
        Self {
            count: records.len(),
            records,
            query,
        }
    }
}
