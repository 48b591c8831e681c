// In crates/api-client/src/lib.rs

pub mod binance;
pub mod connector;
pub mod error;
pub mod frame;
pub mod normalizer;
pub mod venue;

// Re-export public types
pub use binance::{Binance, KlineSink};
pub use connector::{shutdown_requested, Connector, Document, SocketState, StreamExit};
pub use error::{Error, NormalizeError, RequestError, Result, TransportError};
pub use frame::StreamFrame;
pub use normalizer::{from_batch_row, from_streaming_object, StreamingKline};
pub use venue::{DataHandler, Venue};
