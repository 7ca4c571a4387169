//! Turns caller parameters into an upstream request plus the leftover
//! client-side filters.

use chrono::{DateTime, Utc};

use telq_core::filter::{AttributeFilter, FilterValue, TimeWindow};
use telq_core::query::{LogQuery, Pagination, QueryEcho, QueryRequest, SpanQuery};
use telq_core::time::lookback_window;

use crate::flatten::SERVICE_NAME_KEY;
use crate::postfilter::{LogPostFilter, SpanPostFilter};

/// Log queries ask the upstream for twice the final limit so that
/// post-filtering still leaves enough records. Span queries do not inflate.
pub const LOG_PAGE_SIZE_FACTOR: usize = 2;

/// Status code the upstream uses for an errored span.
const ERROR_STATUS_CODE: i64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan<P> {
    pub window: TimeWindow,
    pub filters: Vec<AttributeFilter>,
    pub post: P,
    pub limit: usize,
    pub page_size_hint: usize,
}

impl<P> QueryPlan<P> {
    pub fn request(&self) -> QueryRequest {
        QueryRequest {
            time_range: self.window,
            filter: self.filters.clone(),
            pagination: Pagination {
                limit: self.page_size_hint,
            },
        }
    }

    pub fn echo(&self) -> QueryEcho {
        QueryEcho {
            time_range: self.window,
            filters: self.filters.clone(),
            limit: self.limit,
        }
    }
}

pub fn plan_log_query(query: &LogQuery, now: DateTime<Utc>) -> QueryPlan<LogPostFilter> {
    let mut filters = Vec::new();
    if let Some(service) = non_empty(&query.service_name) {
        filters.push(string_filter(SERVICE_NAME_KEY, service));
    }

    let limit = query.effective_limit();
    QueryPlan {
        window: lookback_window(query.time_range_minutes, now),
        filters,
        post: LogPostFilter {
            min_severity: query.min_severity,
            body_contains: non_empty(&query.body_contains).map(str::to_string),
        },
        limit,
        page_size_hint: limit.saturating_mul(LOG_PAGE_SIZE_FACTOR),
    }
}

pub fn plan_span_query(query: &SpanQuery, now: DateTime<Utc>) -> QueryPlan<SpanPostFilter> {
    let mut filters = Vec::new();
    if let Some(service) = non_empty(&query.service_name) {
        filters.push(string_filter(SERVICE_NAME_KEY, service));
    }
    if let Some(method) = non_empty(&query.http_method) {
        filters.push(string_filter("http.request.method", method));
    }
    if let Some(code) = query.http_status_code.filter(|c| *c > 0) {
        filters.push(AttributeFilter::equals(
            "http.response.status_code",
            FilterValue::int(code),
        ));
    }
    if let Some(name) = non_empty(&query.span_name) {
        filters.push(string_filter("name", name));
    }
    if query.error_only {
        filters.push(AttributeFilter::equals(
            "status.code",
            FilterValue::int(ERROR_STATUS_CODE),
        ));
    }

    let limit = query.effective_limit();
    QueryPlan {
        window: lookback_window(query.time_range_minutes, now),
        filters,
        post: SpanPostFilter {
            min_duration_ms: query.min_duration_ms.filter(|ms| *ms > 0.0),
        },
        limit,
        page_size_hint: limit,
    }
}

fn string_filter(key: &str, value: &str) -> AttributeFilter {
    AttributeFilter::equals(key, FilterValue::StringValue(value.to_string()))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
