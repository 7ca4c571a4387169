//! Resource → scope → record flattening.

use chrono::{DateTime, SecondsFormat};
use serde_json::Value;

use telq_core::model::{Attributes, FlatLog, FlatSpan};

use crate::kind::{Logs, RecordKind, Spans};
use crate::otlp::{KeyValue, RawLog, RawSpan, decode_document};

pub const SERVICE_NAME_KEY: &str = "service.name";

/// Span attributes worth carrying onto a flat span; everything else is noise
/// for the caller.
pub const SPAN_ATTRIBUTE_ALLOW_LIST: [&str; 14] = [
    "http.request.method",
    "http.response.status_code",
    "http.route",
    "http.url",
    "http.target",
    "db.system",
    "db.statement",
    "rpc.method",
    "rpc.service",
    "messaging.system",
    "messaging.operation",
    "error.type",
    "exception.type",
    "exception.message",
];

/// String value of the first `service.name` attribute. Scanning stops at the
/// first key match even when that entry carries no string.
pub fn service_name(attributes: &[KeyValue]) -> String {
    attributes
        .iter()
        .find(|kv| kv.key == SERVICE_NAME_KEY)
        .and_then(|kv| kv.value.string_value.clone())
        .unwrap_or_default()
}

pub fn collect_attributes(kvs: &[KeyValue], keep: impl Fn(&str) -> bool) -> Attributes {
    kvs.iter()
        .filter(|kv| keep(&kv.key))
        .filter_map(|kv| Some((kv.key.clone(), kv.value.resolve()?)))
        .collect()
}

/// Flatten a response payload into one record per leaf, in document order,
/// each carrying its resource's service name.
pub fn flatten<K: RecordKind>(payload: &Value) -> Vec<K::Flat> {
    decode_document::<K::Raw>(payload, K::LAYOUT)
        .into_iter()
        .flat_map(|group| {
            let service = service_name(&group.attributes);
            group
                .scopes
                .into_iter()
                .flat_map(|scope| scope.records)
                .map(move |raw| K::flatten_record(raw, &service))
        })
        .collect()
}

pub fn flatten_logs(payload: &Value) -> Vec<FlatLog> {
    flatten::<Logs>(payload)
}

pub fn flatten_spans(payload: &Value) -> Vec<FlatSpan> {
    flatten::<Spans>(payload)
}

pub fn flatten_log(raw: RawLog, service_name: &str) -> FlatLog {
    let timestamp = raw
        .time_unix_nano
        .filter(|n| *n != 0)
        .or(raw.observed_time_unix_nano.filter(|n| *n != 0))
        .map(format_nanos)
        .unwrap_or_default();

    FlatLog {
        timestamp,
        service_name: service_name.to_string(),
        severity_text: raw.severity_text.unwrap_or_default(),
        severity_number: raw
            .severity_number
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or_default(),
        body: raw.body.unwrap_or_default(),
        trace_id: non_empty(raw.trace_id),
        span_id: non_empty(raw.span_id),
        attributes: collect_attributes(&raw.attributes, |_| true),
    }
}

pub fn flatten_span(raw: RawSpan, service_name: &str) -> FlatSpan {
    // Start, end and duration are all-or-nothing: one bad side blanks the
    // whole interval.
    let (duration_ms, start_time, end_time) =
        match (raw.start_time_unix_nano, raw.end_time_unix_nano) {
            (Some(start), Some(end)) => (
                end.saturating_sub(start).max(0) as f64 / 1_000_000.0,
                format_nanos(start),
                format_nanos(end),
            ),
            _ => (0.0, String::new(), String::new()),
        };

    FlatSpan {
        trace_id: raw.trace_id.unwrap_or_default(),
        span_id: raw.span_id.unwrap_or_default(),
        parent_span_id: non_empty(raw.parent_span_id),
        name: raw.name.unwrap_or_default(),
        service_name: service_name.to_string(),
        duration_ms,
        start_time,
        end_time,
        status_code: raw
            .status_code
            .and_then(|c| i32::try_from(c).ok())
            .unwrap_or_default(),
        status_message: non_empty(raw.status_message),
        attributes: collect_attributes(&raw.attributes, |key| {
            SPAN_ATTRIBUTE_ALLOW_LIST.contains(&key)
        }),
    }
}

fn format_nanos(nanos: i64) -> String {
    DateTime::from_timestamp_nanos(nanos).to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
