//! Filters the upstream cannot express, re-applied after flattening.
//!
//! Every filter is a stable `retain`; record order is never touched.

use telq_core::filter::Severity;
use telq_core::model::{FlatLog, FlatSpan};

pub trait PostFilter<R> {
    fn apply(&self, records: &mut Vec<R>);
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogPostFilter {
    pub min_severity: Option<Severity>,
    pub body_contains: Option<String>,
}

impl PostFilter<FlatLog> for LogPostFilter {
    fn apply(&self, records: &mut Vec<FlatLog>) {
        if let Some(min) = self.min_severity {
            records.retain(|r| r.severity_number >= min.rank());
        }
        if let Some(needle) = &self.body_contains {
            let needle = needle.to_lowercase();
            records.retain(|r| r.body.to_lowercase().contains(&needle));
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpanPostFilter {
    pub min_duration_ms: Option<f64>,
}

impl PostFilter<FlatSpan> for SpanPostFilter {
    fn apply(&self, records: &mut Vec<FlatSpan>) {
        if let Some(threshold) = self.min_duration_ms {
            records.retain(|r| r.duration_ms >= threshold);
        }
    }
}

/// Keep the first `limit` records.
pub fn limit_records<R>(records: &mut Vec<R>, limit: usize) {
    records.truncate(limit);
}
