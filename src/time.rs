//! Time parsing and formatting utilities.

use chrono::{DateTime, TimeDelta, Utc};

/// Parse an RFC 3339 timestamp string into a UTC instant.
///
/// Examples:
/// - "2026-01-31T12:45:31.053Z"
/// - "2026-01-31T12:45:31Z"
/// - "2026-01-31T20:45:31+08:00"
pub fn parse_rfc3339_utc(ts: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(ts.trim()).ok()?;
    Some(parsed.with_timezone(&Utc))
}

/// Whole minutes in a duration, floored. Negative durations count as zero.
pub fn whole_minutes(duration: TimeDelta) -> u64 {
    u64::try_from(duration.num_minutes()).unwrap_or(0)
}

/// Format a duration as `"{h}h {m}m"`, e.g. `"1h 5m"`.
pub fn format_hours_minutes(duration: TimeDelta) -> String {
    let minutes = whole_minutes(duration);
    format!("{}h {}m", minutes / 60, minutes % 60)
}
