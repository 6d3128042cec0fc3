//! Total coercion of raw record fields into canonical values.
//!
//! Records arrive from the local cache and the remote store with
//! heterogeneous shapes: dates as epoch milliseconds, ISO-like strings, or
//! garbage; amounts as numbers or formatted strings ("PKR 12,345").
//! Every function here is total - malformed input never produces an error,
//! only a documented fallback value.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Coerce a raw date field into a valid instant.
///
/// Accepts integer/float epoch milliseconds, RFC 3339 strings, naive
/// `YYYY-MM-DDTHH:MM:SS` strings, and bare `YYYY-MM-DD` dates (midnight
/// UTC). Anything else, including an absent or `null` field, falls back to
/// the caller-supplied `now`.
pub fn coerce_date(value: Option<&Value>, now: DateTime<Utc>) -> DateTime<Utc> {
    match value {
        Some(Value::Number(n)) => millis_to_instant(n).unwrap_or(now),
        Some(Value::String(s)) => parse_date_str(s).unwrap_or(now),
        _ => now,
    }
}

fn millis_to_instant(n: &serde_json::Number) -> Option<DateTime<Utc>> {
    let ms = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
    Utc.timestamp_millis_opt(ms).single()
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Coerce a raw amount field into a non-negative integer.
///
/// Numbers are truncated to integers. Strings are stripped of every
/// character that is not an ASCII digit or `-`, then parsed; an
/// unparseable remainder (including the empty string) yields 0. Negative
/// results clamp to 0.
pub fn coerce_amount(value: Option<&Value>) -> i64 {
    let amount = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let digits: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '-')
                .collect();
            digits.parse::<i64>().unwrap_or(0)
        }
        _ => 0,
    };
    amount.max(0)
}

/// Extract a record identifier, comparing identifiers as strings.
///
/// Numbers are stringified so `5` and `"5"` name the same record. An
/// absent or `null` identifier is missing: the record is skipped by the
/// merge, never coerced.
pub fn coerce_id(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
