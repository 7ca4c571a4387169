use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelqError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, TelqError>;

/// Normalized failure of an upstream call.
///
/// Carries the HTTP status (500 when the request never produced one), the
/// status line as `title`, a best-effort human readable `detail` and the raw
/// response payload when one was returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("upstream request failed with status {status_code}: {detail}")]
pub struct ApiError {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status_code: u16, detail: impl Into<String>) -> Self {
        Self {
            status_code,
            title: None,
            detail: detail.into(),
            payload: None,
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(500, detail)
    }
}
