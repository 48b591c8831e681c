// In crates/app-config/src/lib.rs

use config::{Config, Environment, File};
use std::path::Path;

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{
    AppSettings, CrossoverSettings, DatabaseSettings, LiveConfig, MovingAverageKind, PairConfig,
    Settings, VenueSettings,
};

/// Loads the application settings from various sources.
///
/// This function orchestrates the layered configuration loading:
/// 1. Reads from a default `base.toml` file.
/// 2. Merges settings from an environment-specific file (e.g., `development.toml`).
/// 3. Merges settings from environment variables.
pub fn load_settings() -> Result<Settings> {
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());
    load_settings_from("config", &environment)
}

/// Same as [`load_settings`], reading the TOML files from `dir`.
pub fn load_settings_from(dir: impl AsRef<Path>, environment: &str) -> Result<Settings> {
    let dir = dir.as_ref();

    let settings = Config::builder()
        // 1. Load the base configuration file.
        .add_source(File::with_name(&dir.join("base").to_string_lossy()))
        // 2. Load the environment-specific configuration file.
        .add_source(File::with_name(&dir.join(environment).to_string_lossy()).required(false))
        // 3. Load settings from environment variables (e.g., `APP_DATABASE__URL=...`).
        // The prefix is `APP`, separator is `__`.
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    settings.crossover.validate()?;

    Ok(settings)
}

/// Loads the streamed pair list from `config/live.toml`.
pub fn load_live_config() -> Result<LiveConfig> {
    load_live_config_from("config/live.toml")
}

pub fn load_live_config_from(path: impl AsRef<Path>) -> Result<LiveConfig> {
    let content = std::fs::read_to_string(path)?;

    let config: LiveConfig = toml::from_str(&content)?;
    Ok(config)
}
