use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{Result, TelqError};
use crate::filter::TimeWindow;

pub const DEFAULT_LOOKBACK_MINUTES: f64 = 60.0;
pub const MAX_LOOKBACK_MINUTES: f64 = 1440.0;

/// Resolve a caller lookback into minutes: absent, non-positive or NaN input
/// falls back to the default, anything above a day is clamped to a day.
pub fn effective_lookback_minutes(requested: Option<f64>) -> f64 {
    match requested {
        Some(m) if m > 0.0 => m.min(MAX_LOOKBACK_MINUTES),
        _ => DEFAULT_LOOKBACK_MINUTES,
    }
}

/// Build the query window ending at `now`. `now` is truncated to whole seconds
/// so the window matches what goes over the wire.
pub fn lookback_window(requested: Option<f64>, now: DateTime<Utc>) -> TimeWindow {
    let to = now.trunc_subsecs(0);
    let minutes = effective_lookback_minutes(requested);
    let span = chrono::Duration::milliseconds((minutes * 60_000.0).round() as i64);
    TimeWindow { from: to - span, to }
}

/// Parse a humantime duration such as `15m` or `2h` into lookback minutes.
pub fn parse_lookback_minutes(input: &str) -> Result<f64> {
    humantime::parse_duration(input)
        .map(|d| d.as_secs_f64() / 60.0)
        .map_err(|e| TelqError::Parse(format!("invalid duration {input}: {e}")))
}
