// In crates/core-types/src/timestamp.rs

use crate::error::{Result, TimestampError};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

const SECONDS_DIGITS: u32 = 10;
const MILLIS_DIGITS: u32 = 13;

/// Converts a raw venue epoch value into a UTC instant.
///
/// The venue sends either seconds (10 digits) or milliseconds (13 digits).
/// Millisecond values are truncated to the whole second. Any other width
/// means the wire format changed underneath us and is rejected.
pub fn normalize_timestamp(raw: i64) -> Result<DateTime<Utc>> {
    if raw < 0 {
        return Err(TimestampError::OutOfRange { raw });
    }

    let digits = raw.checked_ilog10().map_or(1, |log| log + 1);
    let seconds = match digits {
        SECONDS_DIGITS => raw,
        MILLIS_DIGITS => raw / 1000,
        _ => return Err(TimestampError::BadDigitCount { raw, digits }),
    };

    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or(TimestampError::OutOfRange { raw })
}

/// Converts an ordered list of raw epoch values, stopping at the first bad one.
pub fn normalize_timestamps(raws: &[i64]) -> Result<Vec<DateTime<Utc>>> {
    raws.iter().copied().map(normalize_timestamp).collect()
}

/// Reads an epoch value out of a decoded JSON field.
pub fn timestamp_from_json(value: &Value) -> Result<DateTime<Utc>> {
    match value.as_i64() {
        Some(raw) => normalize_timestamp(raw),
        None => Err(TimestampError::NotAnInteger { raw: value.to_string() }),
    }
}
