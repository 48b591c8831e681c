// In crates/core-types/src/lib.rs

pub mod error;
pub mod timestamp;
pub mod types;

// Re-export the most important types for easy access from other crates.
pub use error::{Result, TimestampError};
pub use timestamp::{normalize_timestamp, normalize_timestamps, timestamp_from_json};
pub use types::{Candlestick, Signal, SignalPoint, Symbol};
