use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TelqError};

/// OTLP severity levels, ranked on the protocol's own numeric scale.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Trace = 1,
    Debug = 5,
    Info = 9,
    Warn = 13,
    Error = 17,
    Fatal = 21,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
    ];

    pub fn rank(self) -> i32 {
        self as i32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Bucket an arbitrary `severityNumber` into its named level.
    pub fn from_number(number: i32) -> Option<Self> {
        match number {
            1..=4 => Some(Self::Trace),
            5..=8 => Some(Self::Debug),
            9..=12 => Some(Self::Info),
            13..=16 => Some(Self::Warn),
            17..=20 => Some(Self::Error),
            21..=24 => Some(Self::Fatal),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = TelqError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "FATAL" => Ok(Self::Fatal),
            _ => Err(TelqError::Parse(format!("unknown severity: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum FilterOperator {
    #[default]
    #[serde(rename = "equals")]
    Equals,
}

/// Value of a push-down predicate. Integers travel as decimal strings, the
/// upstream's convention for 64-bit numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FilterValue {
    StringValue(String),
    IntValue(String),
    BoolValue(bool),
}

impl FilterValue {
    pub fn int(value: i64) -> Self {
        Self::IntValue(value.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttributeFilter {
    pub key: String,
    pub operator: FilterOperator,
    pub value: FilterValue,
}

impl AttributeFilter {
    pub fn equals(key: impl Into<String>, value: FilterValue) -> Self {
        Self {
            key: key.into(),
            operator: FilterOperator::Equals,
            value,
        }
    }
}

/// Absolute `[from, to)` query interval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    #[serde(with = "rfc3339_secs")]
    pub from: DateTime<Utc>,
    #[serde(with = "rfc3339_secs")]
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn duration(&self) -> chrono::Duration {
        self.to - self.from
    }
}

mod rfc3339_secs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn severity_parse() {
        assert_eq!(Severity::from_str("warn").unwrap(), Severity::Warn);
        assert_eq!(Severity::from_str("WARNING").unwrap(), Severity::Warn);
        assert!(Severity::from_str("wat").is_err());
    }

    #[test]
    fn severity_ranks_follow_protocol_scale() {
        let ranks = Severity::ALL.map(Severity::rank);
        assert_eq!(ranks, [1, 5, 9, 13, 17, 21]);
        assert!(Severity::Trace < Severity::Debug);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn severity_buckets_numbers() {
        assert_eq!(Severity::from_number(10), Some(Severity::Info));
        assert_eq!(Severity::from_number(17), Some(Severity::Error));
        assert_eq!(Severity::from_number(0), None);
    }

    #[test]
    fn attribute_filter_wire_shape() {
        let f = AttributeFilter::equals("http.response.status_code", FilterValue::int(500));
        assert_eq!(
            serde_json::to_value(&f).unwrap(),
            serde_json::json!({
                "key": "http.response.status_code",
                "operator": "equals",
                "value": {"intValue": "500"}
            })
        );

        let f = AttributeFilter::equals("service.name", FilterValue::StringValue("cart".into()));
        assert_eq!(
            serde_json::to_value(&f).unwrap()["value"],
            serde_json::json!({"stringValue": "cart"})
        );
    }

    #[test]
    fn time_window_serializes_whole_seconds() {
        let to = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        let window = TimeWindow {
            from: to - chrono::Duration::minutes(30),
            to,
        };
        assert_eq!(
            serde_json::to_value(window).unwrap(),
            serde_json::json!({"from": "2026-02-01T11:30:00Z", "to": "2026-02-01T12:00:00Z"})
        );
    }
}
