use serde_json::Value;

/// Top-level keys probed for a human readable error, in priority order.
const DETAIL_KEYS: [&str; 4] = ["detail", "message", "error", "errors"];

/// Best-effort human readable detail from an upstream error body. Returns an
/// empty string when nothing recognizable is found.
pub fn extract_error_detail(payload: &Value) -> String {
    let Some(obj) = payload.as_object() else {
        return String::new();
    };
    DETAIL_KEYS
        .iter()
        .filter_map(|key| obj.get(*key))
        .find_map(detail_from)
        .unwrap_or_default()
}

fn detail_from(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => items.first().and_then(|first| match first {
            Value::String(s) => Some(s.clone()),
            Value::Object(_) => nested_detail(first),
            _ => None,
        }),
        Value::Object(_) => nested_detail(value),
        _ => None,
    }
}

fn nested_detail(value: &Value) -> Option<String> {
    ["detail", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
