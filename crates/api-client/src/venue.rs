// In crates/api-client/src/venue.rs

use app_config::VenueSettings;
use async_trait::async_trait;

/// Receives the raw payload of every data frame a stream delivers.
///
/// Frames arrive one at a time and in order; the next frame is not read
/// until this call returns. Returning an error ends the stream.
#[async_trait]
pub trait DataHandler: Send {
    async fn handle_data(&mut self, payload: &str) -> anyhow::Result<()>;
}

/// The capability set a market venue adapter provides to the connector.
pub trait Venue: DataHandler {
    fn settings(&self) -> &VenueSettings;

    /// Root for REST endpoints, e.g. `https://api.binance.com/api/v3`.
    fn api_endpoint(&self) -> String {
        self.settings().api_endpoint()
    }

    /// Root for stream topics, e.g. `wss://stream.binance.com:9443/ws`.
    fn wss_endpoint(&self) -> String {
        self.settings().wss_endpoint()
    }

    fn stream_url(&self, topic: &str) -> String {
        format!("{}/{}", self.wss_endpoint(), topic)
    }
}
