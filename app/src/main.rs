// In app/src/main.rs

use anyhow::Result;
use api_client::binance::server_time;
use api_client::Connector;
use app_config::Settings;
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use core_types::Symbol;
use database::{CandlestickStore, MemoryStore};
use engine::backfill::MAX_PAGE_LIMIT;
use engine::Engine;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::prelude::*;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "Streams Binance klines into storage and flags moving-average crossovers.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Streams every enabled pair from `config/live.toml` until ctrl-c.
    Run {
        /// Keep candlesticks in memory instead of writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Backfills historical kline data from Binance.
    Backfill {
        /// The trading symbol to backfill (e.g., "BTCUSDT").
        #[arg(short, long)]
        symbol: String,

        /// The interval for the klines (e.g., "5m", "1h").
        #[arg(short, long)]
        interval: String,

        /// Optional start date for backfilling in YYYY-MM-DD format.
        #[arg(long)]
        start_date: Option<String>,

        /// Bars requested per page.
        #[arg(long, default_value_t = MAX_PAGE_LIMIT)]
        limit: u16,
    },

    /// Prints the venue's clock.
    ServerTime,
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let settings = app_config::load_settings()?;
    init_tracing(&settings);

    // Parse command-line arguments.
    let cli = Cli::parse();

    tracing::info!(environment = %settings.app.environment, "Starting kline feed application");

    match cli.command {
        Commands::Run { dry_run } => run_app(settings, dry_run).await?,
        Commands::Backfill {
            symbol,
            interval,
            start_date,
            limit,
        } => handle_backfill(settings, symbol, interval, start_date, limit).await?,
        Commands::ServerTime => handle_server_time(settings).await?,
    }

    Ok(())
}

fn init_tracing(settings: &Settings) {
    let default_level = tracing::Level::from_str(&settings.app.log_level).unwrap_or(tracing::Level::INFO);
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::filter::Targets::new()
            .with_target("sqlx::query", tracing::Level::WARN) // Disable sqlx query debug logs
            .with_default(default_level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();
}

/// Flips the returned flag to `true` on ctrl-c.
fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c.");
            return;
        }
        tracing::info!("Shutdown requested.");
        let _ = tx.send(true);
    });
    rx
}

// --- "Run" Subcommand Logic ---

async fn run_app(settings: Settings, dry_run: bool) -> Result<()> {
    let live_config = app_config::load_live_config()?;
    let shutdown = shutdown_on_ctrl_c();

    if dry_run {
        tracing::warn!("Dry run: candlesticks are kept in memory only.");
        let store = Arc::new(MemoryStore::new());
        let engine = Engine::new(live_config, settings, store.clone());
        let result = engine.run(shutdown).await;
        tracing::info!(stored = store.candlesticks().len(), "Dry run finished.");
        return result;
    }

    let db = database::connect(&settings.database).await?;
    tracing::info!("Database connection established.");

    let engine = Engine::new(live_config, settings, Arc::new(db.clone()));
    let result = engine.run(shutdown).await;

    db.close().await;
    result
}

// --- "Backfill" Subcommand Logic ---

async fn handle_backfill(
    settings: Settings,
    symbol_str: String,
    interval: String,
    start_date: Option<String>,
    limit: u16,
) -> Result<()> {
    let start_time = match start_date {
        Some(date_str) => {
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
                .map_err(|e| anyhow::anyhow!("Failed to parse start date: {}", e))?;
            let dt = Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));
            tracing::info!("Using provided start date: {}", dt);
            Some(dt.timestamp_millis())
        }
        None => {
            tracing::info!("No start date provided. Fetching only the most recent page.");
            None
        }
    };

    let db = database::connect(&settings.database).await?;
    let mut connector = Connector::new(&settings.binance);
    connector.open()?;

    let store: &dyn CandlestickStore = &db;
    let result = engine::backfill(&connector, store, &Symbol::new(&symbol_str), &interval, start_time, limit).await;

    connector.close().await;
    db.close().await;

    let stored = result?;
    tracing::info!(stored, "Backfill finished.");
    Ok(())
}

// --- "ServerTime" Subcommand Logic ---

async fn handle_server_time(settings: Settings) -> Result<()> {
    let mut connector = Connector::new(&settings.binance);
    connector.open()?;

    let result = server_time(&connector).await;
    connector.close().await;

    let time = result?;
    println!("{}", serde_json::json!({ "serverTime": time.to_rfc3339() }));
    Ok(())
}
