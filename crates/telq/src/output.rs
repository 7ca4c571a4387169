use std::io::IsTerminal;

use owo_colors::OwoColorize;
use telq_core::ApiError;
use telq_core::filter::Severity;
use telq_core::model::{AttrValue, Attributes, FlatLog, FlatSpan};
use telq_core::query::{QueryEcho, QueryEnvelope};

pub fn print_logs_human(v: &QueryEnvelope<FlatLog>) {
    let color = std::io::stdout().is_terminal();
    for row in &v.records {
        let trace = row.trace_id.as_deref().unwrap_or("-");
        let span = row.span_id.as_deref().unwrap_or("-");
        println!(
            "{} {} {} trace={} span={} | {}{}",
            or_dash(&row.timestamp),
            or_dash(&row.service_name),
            severity_label(row, color),
            trace,
            span,
            row.body,
            attrs_suffix(&row.attributes)
        );
    }
    print_footer("logs", v.count, &v.query);
}

pub fn print_spans_human(v: &QueryEnvelope<FlatSpan>) {
    let color = std::io::stdout().is_terminal();
    for row in &v.records {
        println!(
            "{} {} \"{}\" {:.1}ms {} trace={} span={}{}",
            or_dash(&row.start_time),
            or_dash(&row.service_name),
            row.name,
            row.duration_ms,
            status_label(row, color),
            or_dash(&row.trace_id),
            or_dash(&row.span_id),
            attrs_suffix(&row.attributes)
        );
    }
    print_footer("spans", v.count, &v.query);
}

pub fn print_error_human(err: &ApiError) {
    match &err.title {
        Some(title) => eprintln!("error: {title}: {}", err.detail),
        None => eprintln!("error: {err}"),
    }
}

fn print_footer(kind: &str, count: usize, query: &QueryEcho) {
    println!(
        "-- {count} {kind} (limit {}, {} .. {}, {} filters) --",
        query.limit,
        query.time_range.from.to_rfc3339(),
        query.time_range.to.to_rfc3339(),
        query.filters.len()
    );
}

fn severity_label(row: &FlatLog, color: bool) -> String {
    let level = Severity::from_number(row.severity_number);
    let text = match (row.severity_text.as_str(), level) {
        ("", Some(level)) => level.as_str(),
        ("", None) => "-",
        (text, _) => text,
    };
    if !color {
        return text.to_string();
    }
    match level {
        Some(Severity::Trace) => text.blue().to_string(),
        Some(Severity::Debug) => text.bright_black().to_string(),
        Some(Severity::Info) => text.green().to_string(),
        Some(Severity::Warn) => text.yellow().to_string(),
        Some(Severity::Error) => text.red().to_string(),
        Some(Severity::Fatal) => text.magenta().to_string(),
        None => text.to_string(),
    }
}

fn status_label(row: &FlatSpan, color: bool) -> String {
    let text = match row.status_code {
        1 => "OK",
        2 => "ERROR",
        _ => "UNSET",
    };
    let text = match &row.status_message {
        Some(msg) => format!("{text}({msg})"),
        None => text.to_string(),
    };
    if color && row.is_error() {
        text.red().to_string()
    } else {
        text
    }
}

fn attrs_suffix(attrs: &Attributes) -> String {
    attrs
        .iter()
        .map(|(k, v)| match v {
            AttrValue::String(s) => format!(" {k}={s}"),
            AttrValue::Int(i) => format!(" {k}={i}"),
            AttrValue::Bool(b) => format!(" {k}={b}"),
        })
        .collect()
}

fn or_dash(value: &str) -> &str {
    if value.is_empty() { "-" } else { value }
}
