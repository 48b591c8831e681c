// In crates/app-config/src/types.rs

use serde::Deserialize;
use std::time::Duration;

pub use strategies::types::{CrossoverSettings, MovingAverageKind};

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    /// Endpoints and timeouts for the Binance venue.
    pub binance: VenueSettings,
    /// Settings for the database connection.
    pub database: DatabaseSettings,
    /// Moving-average crossover parameters shared by every streamed pair.
    pub crossover: CrossoverSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    pub log_level: String,
}

/// Where a venue lives. Handed to the connector at construction.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct VenueSettings {
    /// The REST API root (e.g. "https://api.binance.com").
    pub rest_base_url: String,
    /// The WebSocket root (e.g. "wss://stream.binance.com:9443").
    pub ws_base_url: String,
    #[serde(default = "default_api_version_path")]
    pub api_version_path: String,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Pause between streaming reconnects.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl VenueSettings {
    /// `{rest_base_url}{api_version_path}`, the prefix for every REST endpoint.
    pub fn api_endpoint(&self) -> String {
        format!("{}{}", self.rest_base_url.trim_end_matches('/'), self.api_version_path)
    }

    /// `{ws_base_url}{ws_path}`, the prefix for every stream topic.
    pub fn wss_endpoint(&self) -> String {
        format!("{}{}", self.ws_base_url.trim_end_matches('/'), self.ws_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseSettings {
    /// The connection URL for the PostgreSQL database.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

// --- Structs for live.toml Configuration ---

/// The pairs to stream during a live run.
#[derive(Deserialize, Debug, Clone)]
pub struct LiveConfig {
    #[serde(rename = "pairs")]
    pub pair_configs: Vec<PairConfig>,
}

/// Configuration for a single trading pair/asset.
#[derive(Deserialize, Debug, Clone)]
pub struct PairConfig {
    pub symbol: String,
    pub interval: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Helper functions for serde defaults
fn default_api_version_path() -> String { "/api/v3".into() }
fn default_ws_path() -> String { "/ws".into() }
fn default_request_timeout_secs() -> u64 { 10 }
fn default_reconnect_delay_secs() -> u64 { 5 }
fn default_max_connections() -> u32 { 5 }
fn default_enabled() -> bool { true }
