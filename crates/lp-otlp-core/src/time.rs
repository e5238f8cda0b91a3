//! Timestamp helpers. All timestamps are unix nanoseconds, zero meaning "unset".

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, FieldValue};

/// Current wall-clock time in unix nanoseconds.
pub fn now_unix_nano() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or_default()
}

/// Replaces an unset timestamp with the current time.
pub fn or_now(ts: u64) -> u64 {
    if ts == 0 {
        now_unix_nano()
    } else {
        ts
    }
}

/// Reads a start time field: RFC3339 text or integer unix nanoseconds.
pub fn parse_start_time(value: &FieldValue) -> Result<u64, Error> {
    match value {
        FieldValue::String(s) => {
            let parsed = DateTime::parse_from_rfc3339(s)
                .map_err(|_| Error::InvalidTimestamp(s.clone()))?;
            parsed
                .timestamp_nanos_opt()
                .and_then(|n| u64::try_from(n).ok())
                .ok_or_else(|| Error::InvalidTimestamp(s.clone()))
        }
        FieldValue::Int(n) => u64::try_from(*n).map_err(|_| Error::InvalidTimestamp(n.to_string())),
        FieldValue::UInt(n) => Ok(*n),
        other => Err(Error::InvalidTimestamp(other.to_string())),
    }
}

/// Formats unix nanoseconds as RFC3339 with nanosecond precision.
pub fn format_rfc3339(unix_nano: u64) -> String {
    let nanos = i64::try_from(unix_nano).unwrap_or(i64::MAX);
    DateTime::<Utc>::from_timestamp_nanos(nanos).to_rfc3339_opts(SecondsFormat::Nanos, true)
}
