use serde::{Deserialize, Serialize};

use crate::model::attr::Attributes;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FlatSpan {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: String,
    pub service_name: String,
    pub duration_ms: f64,
    pub start_time: String,
    pub end_time: String,
    pub status_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl FlatSpan {
    pub fn is_error(&self) -> bool {
        self.status_code == 2
    }
}
