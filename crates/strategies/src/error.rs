// In crates/strategies/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Moving average series differ in length: short {short}, long {long}")]
    LengthMismatch { short: usize, long: usize },

    #[error("Moving average window must be at least 1, got {window}")]
    InvalidWindow { window: usize },

    #[error("Short window {short} must be smaller than long window {long}")]
    InvalidWindows { short: usize, long: usize },

    #[error("History size {history} cannot hold the long window {long}")]
    HistoryTooSmall { history: usize, long: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
