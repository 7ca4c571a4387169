use serde::{Deserialize, Serialize};

use crate::model::attr::Attributes;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FlatLog {
    pub timestamp: String,
    pub service_name: String,
    pub severity_text: String,
    pub severity_number: i32,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}
