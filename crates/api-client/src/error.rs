// In crates/api-client/src/error.rs

use chrono::{DateTime, Utc};
use core_types::TimestampError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Connector used before open()")]
    NotOpen,
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(#[from] serde_json::Error),
    #[error("Malformed venue data: {0}")]
    Normalize(#[from] NormalizeError),
    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(String),
    #[error("Stream data handler failed: {0}")]
    Handler(#[source] anyhow::Error),
}

impl Error {
    /// Whether the call is worth repeating as-is.
    ///
    /// HTTP status and transport failures are; malformed venue data and
    /// programming errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Request(_) | Error::Transport(_))
    }
}

/// A REST call that reached the venue but did not come back with a 200.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("GET {url} returned {status} {reason}: {raw_body}")]
    Status { status: u16, reason: String, url: String, raw_body: String },
    #[error("GET {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP transport failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("WebSocket handshake with {url} failed: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("WebSocket handshake with {url} timed out after {timeout:?}")]
    ConnectTimeout { url: String, timeout: Duration },
    #[error("WebSocket write failed: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A venue payload that cannot become a [`core_types::Candlestick`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("batch row has {len} fields, expected at least 9")]
    ShortRow { len: usize },
    #[error("field `{field}` is missing")]
    MissingField { field: &'static str },
    #[error("field `{field}` has unexpected value {found}")]
    WrongType { field: &'static str, found: String },
    #[error("close time {close_time} precedes open time {open_time}")]
    InvertedTimes { open_time: DateTime<Utc>, close_time: DateTime<Utc> },
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
}

pub type Result<T> = std::result::Result<T, Error>;
