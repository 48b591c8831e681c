// In crates/api-client/src/frame.rs

use tokio_tungstenite::tungstenite::Message;

/// One inbound websocket read, classified for dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Text payload, or a binary payload that is valid UTF-8.
    Data(String),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    /// Close frame with the peer's reason, if it gave one.
    Close(Option<String>),
    Error(String),
}

impl StreamFrame {
    /// Returns `None` for raw frames, which a reader never yields.
    pub fn from_message(message: Message) -> Option<Self> {
        let frame = match message {
            Message::Text(text) => StreamFrame::Data(text.as_str().to_owned()),
            Message::Binary(bytes) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => StreamFrame::Data(text),
                Err(_) => StreamFrame::Error(format!("non UTF-8 binary frame of {} bytes", bytes.len())),
            },
            Message::Ping(payload) => StreamFrame::Ping(payload.to_vec()),
            Message::Pong(payload) => StreamFrame::Pong(payload.to_vec()),
            Message::Close(frame) => StreamFrame::Close(frame.map(|f| f.reason.as_str().to_owned())),
            Message::Frame(_) => return None,
        };
        Some(frame)
    }
}
