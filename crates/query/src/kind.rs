use serde::Serialize;

use telq_core::model::{FlatLog, FlatSpan};
use telq_core::query::Signal;

use crate::flatten::{flatten_log, flatten_span};
use crate::otlp::{LeafRecord, Layout, RawLog, RawSpan};
use crate::postfilter::{LogPostFilter, PostFilter, SpanPostFilter};

/// One record kind the engine can query: where its endpoint lives, how its
/// response nests, and how a leaf becomes a flat record.
pub trait RecordKind {
    const SIGNAL: Signal;
    const LAYOUT: Layout;

    type Raw: LeafRecord;
    type Flat: Serialize + Send;
    type Post: PostFilter<Self::Flat>;

    fn flatten_record(raw: Self::Raw, service_name: &str) -> Self::Flat;
}

pub struct Logs;

impl RecordKind for Logs {
    const SIGNAL: Signal = Signal::Logs;
    const LAYOUT: Layout = Layout {
        resources: "resourceLogs",
        scopes: "scopeLogs",
        records: "logRecords",
    };

    type Raw = RawLog;
    type Flat = FlatLog;
    type Post = LogPostFilter;

    fn flatten_record(raw: RawLog, service_name: &str) -> FlatLog {
        flatten_log(raw, service_name)
    }
}

pub struct Spans;

impl RecordKind for Spans {
    const SIGNAL: Signal = Signal::Spans;
    const LAYOUT: Layout = Layout {
        resources: "resourceSpans",
        scopes: "scopeSpans",
        records: "spans",
    };

    type Raw = RawSpan;
    type Flat = FlatSpan;
    type Post = SpanPostFilter;

    fn flatten_record(raw: RawSpan, service_name: &str) -> FlatSpan {
        flatten_span(raw, service_name)
    }
}
