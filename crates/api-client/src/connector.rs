// In crates/api-client/src/connector.rs

use crate::error::{Error, RequestError, Result, TransportError};
use crate::frame::StreamFrame;
use crate::venue::{DataHandler, Venue};
use app_config::VenueSettings;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// Upper bound on sending our close frame to a peer that may be gone.
const SOCKET_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of the streaming socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Closed,
    Connecting,
    Open,
}

/// Why [`Connector::listen_stream`] returned without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamExit {
    /// The shutdown signal fired.
    Cancelled,
    /// The peer sent a close frame.
    PeerClosed(Option<String>),
    /// The socket reported an error; it has been torn down.
    Errored(String),
    /// The socket ended without a close frame.
    SocketClosed,
}

/// A successful REST response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// 200 with an empty body.
    Empty,
    Json(Value),
}

/// Owns one HTTP session and at most one streaming socket for a venue.
///
/// `request` and `listen_stream` fail with [`Error::NotOpen`] until
/// [`open`](Connector::open) is called.
#[derive(Debug)]
pub struct Connector {
    api_endpoint: String,
    request_timeout: Duration,
    session: Option<Client>,
    socket: Option<WsStream>,
    state: SocketState,
}

impl Connector {
    /// Creates a closed connector for the venue described by `settings`.
    pub fn new(settings: &VenueSettings) -> Self {
        Self::with_endpoint(settings.api_endpoint(), settings.request_timeout())
    }

    pub fn for_venue(venue: &impl Venue) -> Self {
        Self::with_endpoint(venue.api_endpoint(), venue.settings().request_timeout())
    }

    fn with_endpoint(api_endpoint: String, request_timeout: Duration) -> Self {
        Self {
            api_endpoint,
            request_timeout,
            session: None,
            socket: None,
            state: SocketState::Closed,
        }
    }

    /// Acquires the HTTP session. Calling it on an open connector is a no-op.
    pub fn open(&mut self) -> Result<()> {
        if self.session.is_some() {
            tracing::debug!("Connector already open.");
            return Ok(());
        }

        let client = Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(TransportError::Http)?;
        self.session = Some(client);
        tracing::debug!(api_endpoint = %self.api_endpoint, "Connector opened.");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn socket_state(&self) -> SocketState {
        self.state
    }

    /// Releases the socket (if any) and the HTTP session.
    ///
    /// Safe to call on a connector that was never opened or is already closed.
    pub async fn close(&mut self) {
        self.close_socket().await;
        if self.session.take().is_some() {
            tracing::debug!("Connector closed.");
        }
    }

    /// Issues `GET {api_endpoint}/{endpoint}` with `params` as the query string.
    ///
    /// Any status other than 200 comes back as [`RequestError::Status`] and is
    /// logged at warning level. A 200 with an empty body is [`Document::Empty`].
    pub async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Document> {
        let client = self.session.as_ref().ok_or(Error::NotOpen)?;
        let url = format!("{}/{}", self.api_endpoint, endpoint);

        tracing::info!(url = %url, "GET request.");
        let response = client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.transport_failure(&url, e))?;

        let status = response.status();
        let full_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_failure(&full_url, e))?;

        if status != StatusCode::OK {
            let reason = status.canonical_reason().unwrap_or_default().to_owned();
            tracing::warn!(
                status = status.as_u16(),
                reason = %reason,
                url = %full_url,
                raw_body = %body,
                "Request returned a non-200 status."
            );
            return Err(RequestError::Status {
                status: status.as_u16(),
                reason,
                url: full_url,
                raw_body: body,
            }
            .into());
        }

        if body.trim().is_empty() {
            return Ok(Document::Empty);
        }
        Ok(Document::Json(serde_json::from_str(&body)?))
    }

    fn transport_failure(&self, url: &str, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            tracing::warn!(url = %url, timeout = ?self.request_timeout, "Request timed out.");
            RequestError::Timeout { url: url.to_owned(), timeout: self.request_timeout }.into()
        } else {
            TransportError::Http(error).into()
        }
    }

    /// Connects to `url` and feeds every data frame to `handler` until the
    /// stream ends or `shutdown` turns `true`.
    ///
    /// Pings are answered with a matching pong. A close frame, an error, or
    /// the socket going away ends the loop without an error. Nothing here
    /// reconnects; that is the caller's call. The socket is torn down on
    /// every exit path.
    pub async fn listen_stream<H>(
        &mut self,
        url: &str,
        handler: &mut H,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<StreamExit>
    where
        H: DataHandler + ?Sized,
    {
        if self.session.is_none() {
            return Err(Error::NotOpen);
        }
        // One socket per connector.
        self.close_socket().await;

        if *shutdown.borrow() {
            return Ok(StreamExit::Cancelled);
        }

        tracing::info!(url = %url, "Connecting to websocket.");
        self.state = SocketState::Connecting;

        let connected = tokio::select! {
            biased;
            _ = shutdown_requested(shutdown) => {
                self.state = SocketState::Closed;
                return Ok(StreamExit::Cancelled);
            }
            connected = tokio::time::timeout(self.request_timeout, connect_async(url)) => connected,
        };

        let socket = match connected {
            Ok(Ok((socket, _response))) => socket,
            Ok(Err(source)) => {
                self.state = SocketState::Closed;
                return Err(TransportError::Connect { url: url.to_owned(), source }.into());
            }
            Err(_elapsed) => {
                self.state = SocketState::Closed;
                return Err(TransportError::ConnectTimeout {
                    url: url.to_owned(),
                    timeout: self.request_timeout,
                }
                .into());
            }
        };

        self.socket = Some(socket);
        self.state = SocketState::Open;
        tracing::info!(url = %url, "Websocket connected.");

        let exit = self.dispatch(handler, shutdown).await;
        self.close_socket().await;
        exit
    }

    async fn dispatch<H>(&mut self, handler: &mut H, shutdown: &mut watch::Receiver<bool>) -> Result<StreamExit>
    where
        H: DataHandler + ?Sized,
    {
        let Some(socket) = self.socket.as_mut() else {
            return Ok(StreamExit::SocketClosed);
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => {
                    tracing::info!("Shutdown requested, closing websocket.");
                    return Ok(StreamExit::Cancelled);
                }
                next = socket.next() => next,
            };

            let frame = match next {
                None => {
                    tracing::info!("Connection is closed, exiting.");
                    return Ok(StreamExit::SocketClosed);
                }
                Some(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => {
                    tracing::info!("Connection is closed, exiting.");
                    return Ok(StreamExit::SocketClosed);
                }
                Some(Err(e)) => StreamFrame::Error(e.to_string()),
                Some(Ok(message)) => match StreamFrame::from_message(message) {
                    Some(frame) => frame,
                    None => continue,
                },
            };

            match frame {
                StreamFrame::Data(payload) => {
                    handler.handle_data(&payload).await.map_err(Error::Handler)?;
                }
                StreamFrame::Ping(payload) => {
                    tracing::debug!("Replying to ping frame.");
                    socket
                        .send(Message::Pong(payload.into()))
                        .await
                        .map_err(TransportError::Socket)?;
                }
                StreamFrame::Pong(_) => {
                    tracing::trace!("Pong frame received.");
                }
                StreamFrame::Close(reason) => {
                    tracing::info!(?reason, "Received close frame from websocket.");
                    return Ok(StreamExit::PeerClosed(reason));
                }
                StreamFrame::Error(error) => {
                    tracing::warn!(error = %error, "Websocket error, closing stream.");
                    return Ok(StreamExit::Errored(error));
                }
            }
        }
    }

    async fn close_socket(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            match tokio::time::timeout(SOCKET_CLOSE_TIMEOUT, socket.close(None)).await {
                Ok(Ok(())) => tracing::debug!("Websocket closed."),
                Ok(Err(e)) => tracing::debug!(error = %e, "Websocket was already closed."),
                Err(_) => tracing::warn!("Timed out sending websocket close frame."),
            }
        }
        self.state = SocketState::Closed;
    }
}

/// Resolves once the shutdown flag is `true`. A dropped sender never cancels.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
