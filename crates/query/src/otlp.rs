//! Lenient decode of OTLP/JSON query responses.
//!
//! Every node is read through optional accessors: a field that is absent or
//! has an unexpected JSON type decodes to `None` (or an empty list) and the
//! rest of the tree is still decoded. Nothing here can fail.

use serde_json::{Map, Value};

use telq_core::model::AttrValue;

/// `{stringValue | intValue | boolValue}`; only correctly typed variants are
/// kept. `intValue` is held in its decimal string form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnyValue {
    pub string_value: Option<String>,
    pub int_value: Option<String>,
    pub bool_value: Option<bool>,
}

impl AnyValue {
    pub fn decode(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };
        Self {
            string_value: str_field(obj, "stringValue"),
            int_value: obj.get("intValue").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
                _ => None,
            }),
            bool_value: obj.get("boolValue").and_then(Value::as_bool),
        }
    }

    /// First present variant wins, in string, int, bool order. A present
    /// `intValue` that does not parse resolves to nothing, even if a bool is
    /// also set.
    pub fn resolve(&self) -> Option<AttrValue> {
        if let Some(s) = &self.string_value {
            return Some(AttrValue::String(s.clone()));
        }
        if let Some(i) = &self.int_value {
            return i.parse::<i64>().ok().map(AttrValue::Int);
        }
        self.bool_value.map(AttrValue::Bool)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: AnyValue,
}

impl KeyValue {
    fn decode(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            key: str_field(obj, "key")?,
            value: obj.get("value").map(AnyValue::decode).unwrap_or_default(),
        })
    }
}

/// A leaf record type that can be lifted out of a JSON object.
pub trait LeafRecord: Sized {
    fn decode(obj: &Map<String, Value>) -> Self;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeGroup<R> {
    pub records: Vec<R>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGroup<R> {
    pub attributes: Vec<KeyValue>,
    pub scopes: Vec<ScopeGroup<R>>,
}

/// JSON keys naming the three levels of a response.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub resources: &'static str,
    pub scopes: &'static str,
    pub records: &'static str,
}

pub fn decode_document<R: LeafRecord>(payload: &Value, layout: Layout) -> Vec<ResourceGroup<R>> {
    objects(payload, layout.resources)
        .map(|resource| ResourceGroup {
            attributes: resource
                .get("resource")
                .map(attributes)
                .unwrap_or_default(),
            scopes: objects_in(resource, layout.scopes)
                .map(|scope| ScopeGroup {
                    records: objects_in(scope, layout.records).map(R::decode).collect(),
                })
                .collect(),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLog {
    pub time_unix_nano: Option<i64>,
    pub observed_time_unix_nano: Option<i64>,
    pub severity_text: Option<String>,
    pub severity_number: Option<i64>,
    pub body: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub attributes: Vec<KeyValue>,
}

impl LeafRecord for RawLog {
    fn decode(obj: &Map<String, Value>) -> Self {
        Self {
            time_unix_nano: nanos_field(obj, "timeUnixNano"),
            observed_time_unix_nano: nanos_field(obj, "observedTimeUnixNano"),
            severity_text: str_field(obj, "severityText"),
            severity_number: int_field(obj, "severityNumber"),
            body: obj
                .get("body")
                .and_then(Value::as_object)
                .and_then(|b| str_field(b, "stringValue")),
            trace_id: str_field(obj, "traceId"),
            span_id: str_field(obj, "spanId"),
            attributes: obj.get("attributes").map(kv_list).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSpan {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub name: Option<String>,
    pub start_time_unix_nano: Option<i64>,
    pub end_time_unix_nano: Option<i64>,
    pub status_code: Option<i64>,
    pub status_message: Option<String>,
    pub attributes: Vec<KeyValue>,
}

impl LeafRecord for RawSpan {
    fn decode(obj: &Map<String, Value>) -> Self {
        let status = obj.get("status").and_then(Value::as_object);
        Self {
            trace_id: str_field(obj, "traceId"),
            span_id: str_field(obj, "spanId"),
            parent_span_id: str_field(obj, "parentSpanId"),
            name: str_field(obj, "name"),
            start_time_unix_nano: nanos_field(obj, "startTimeUnixNano"),
            end_time_unix_nano: nanos_field(obj, "endTimeUnixNano"),
            status_code: status.and_then(|s| int_field(s, "code")),
            status_message: status.and_then(|s| str_field(s, "message")),
            attributes: obj.get("attributes").map(kv_list).unwrap_or_default(),
        }
    }
}

fn attributes(resource: &Value) -> Vec<KeyValue> {
    resource
        .as_object()
        .and_then(|r| r.get("attributes"))
        .map(kv_list)
        .unwrap_or_default()
}

fn kv_list(value: &Value) -> Vec<KeyValue> {
    value
        .as_array()
        .map(|items| items.iter().filter_map(KeyValue::decode).collect())
        .unwrap_or_default()
}

fn objects<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    value
        .as_object()
        .into_iter()
        .flat_map(move |obj| objects_in(obj, key))
}

fn objects_in<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    obj.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn int_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    let value = obj.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}

/// Nanosecond timestamps arrive as decimal strings; plain integers are
/// accepted too.
fn nanos_field(obj: &Map<String, Value>, key: &str) -> Option<i64> {
    match obj.get(key)? {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}
