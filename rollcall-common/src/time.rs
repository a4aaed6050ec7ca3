//! Timestamp utilities

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format a timestamp the way stored records carry it (RFC 3339, millisecond precision)
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render epoch milliseconds as RFC 3339, or `None` when out of range
pub fn millis_to_rfc3339(millis: i64) -> Option<String> {
    Utc.timestamp_millis_opt(millis).single().map(format_timestamp)
}

/// Parse a loosely-typed timestamp field into epoch milliseconds
///
/// Accepts RFC 3339 strings, `YYYY-MM-DD HH:MM:SS[.fff]` strings (taken as UTC)
/// and integer epoch milliseconds. Anything else yields `None`.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }

    // SQLite-style and zone-less ISO forms
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}
