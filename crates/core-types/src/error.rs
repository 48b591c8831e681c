// In crates/core-types/src/error.rs

use thiserror::Error;

/// Raised when an epoch value from the venue cannot be turned into an instant.
///
/// Every variant carries the offending raw value so the log line alone is
/// enough to find the bad frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("bad timestamp {raw}: expected 10 or 13 digits, got {digits}")]
    BadDigitCount { raw: i64, digits: u32 },
    #[error("bad timestamp {raw}: not an integer")]
    NotAnInteger { raw: String },
    #[error("bad timestamp {raw}: outside the representable range")]
    OutOfRange { raw: i64 },
}

pub type Result<T> = std::result::Result<T, TimestampError>;
