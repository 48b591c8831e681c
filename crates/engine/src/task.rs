// In crates/engine/src/task.rs

use crate::pipeline::SignalPipeline;
use api_client::binance::{kline_topic, klines};
use api_client::{shutdown_requested, Binance, Connector, StreamExit, Venue};
use app_config::VenueSettings;
use chrono::Utc;
use core_types::Symbol;
use std::time::Duration;
use tokio::sync::watch;

/// A self-contained task that keeps one pair's kline feed flowing into its
/// pipeline until shutdown is requested.
pub struct FeedTask {
    symbol: Symbol,
    interval: String,
    warmup_bars: u16,
    reconnect_delay: Duration,
    venue: Binance<SignalPipeline>,
    connector: Connector,
}

impl FeedTask {
    pub fn new(
        symbol: Symbol,
        interval: String,
        settings: VenueSettings,
        pipeline: SignalPipeline,
        warmup_bars: u16,
    ) -> Self {
        let reconnect_delay = settings.reconnect_delay();
        let venue = Binance::new(settings, pipeline);
        let connector = Connector::for_venue(&venue);
        Self {
            symbol,
            interval,
            warmup_bars,
            reconnect_delay,
            venue,
            connector,
        }
    }

    /// Warms up over REST, then streams until `shutdown` flips to `true`.
    ///
    /// Dropped sockets and transport failures are retried after the
    /// reconnect delay. Anything else (persistence failures included) ends
    /// the task with an error.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        tracing::info!(symbol = %self.symbol, interval = %self.interval, "Starting feed task.");
        self.connector.open()?;

        let result = self.drive(&mut shutdown).await;
        self.connector.close().await;

        match &result {
            Ok(()) => tracing::info!(symbol = %self.symbol, "Feed task stopped."),
            Err(e) => tracing::error!(symbol = %self.symbol, error = %e, "Feed task failed."),
        }
        result
    }

    async fn drive(&mut self, shutdown: &mut watch::Receiver<bool>) -> anyhow::Result<()> {
        // --- 1. Warm-up Phase ---
        if self.warmup_bars > 0 {
            self.warm_up().await?;
        }

        // --- 2. Live Loop ---
        let url = self.venue.stream_url(&kline_topic(&self.symbol, &self.interval));
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.connector.listen_stream(&url, &mut self.venue, shutdown).await {
                Ok(StreamExit::Cancelled) => return Ok(()),
                Ok(exit) => {
                    tracing::warn!(symbol = %self.symbol, ?exit, attempt, "Kline stream ended, reconnecting.");
                }
                Err(e) if e.is_retryable() => {
                    tracing::warn!(symbol = %self.symbol, error = %e, attempt, "Kline stream failed, reconnecting.");
                }
                Err(e) => return Err(e.into()),
            }

            tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => return Ok(()),
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
    }

    async fn warm_up(&mut self) -> anyhow::Result<()> {
        let fetched = klines(
            &self.connector,
            &self.symbol,
            &self.interval,
            None,
            Some(self.warmup_bars),
        )
        .await;

        let candles = match fetched {
            Ok(candles) => candles,
            Err(e) if e.is_retryable() => {
                tracing::warn!(symbol = %self.symbol, error = %e, "Warm-up fetch failed, streaming without history.");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        // The newest row is usually the bar still in progress.
        let now = Utc::now();
        let closed: Vec<_> = candles.into_iter().filter(|c| c.is_closed_at(now)).collect();

        self.venue.sink_mut().warm_up(closed).await
    }
}
