// In crates/engine/src/lib.rs

pub mod backfill;
pub mod pipeline;
pub mod task;

use crate::pipeline::SignalPipeline;
use crate::task::FeedTask;
use anyhow::Result;
use app_config::{LiveConfig, Settings};
use core_types::Symbol;
use database::CandlestickStore;
use futures::future;
use std::sync::Arc;
use strategies::MACrossover;
use tokio::sync::watch;

pub use backfill::backfill;

/// The orchestrator for all configured feeds.
pub struct Engine {
    live_config: LiveConfig,
    app_config: Settings,
    store: Arc<dyn CandlestickStore>,
}

impl Engine {
    pub fn new(live_config: LiveConfig, app_config: Settings, store: Arc<dyn CandlestickStore>) -> Self {
        Self {
            live_config,
            app_config,
            store,
        }
    }

    /// Spawns a `FeedTask` for each enabled pair and waits for all of them.
    ///
    /// Flipping `shutdown` to `true` stops every task.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!("Initializing feed engine...");

        let crossover = &self.app_config.crossover;
        let mut task_handles = vec![];

        for pair_config in &self.live_config.pair_configs {
            if !pair_config.enabled {
                tracing::warn!(symbol = %pair_config.symbol, "Skipping disabled pair.");
                continue;
            }

            let symbol = Symbol::new(&pair_config.symbol);
            tracing::info!(%symbol, interval = %pair_config.interval, "Setting up feed task.");

            let strategy = MACrossover::new(crossover.clone())?;
            let pipeline = SignalPipeline::new(
                symbol.clone(),
                pair_config.interval.clone(),
                Arc::clone(&self.store),
                Box::new(strategy),
                crossover.history_size,
            );

            let task = FeedTask::new(
                symbol,
                pair_config.interval.clone(),
                self.app_config.binance.clone(),
                pipeline,
                crossover.warmup_bars,
            );

            task_handles.push(tokio::spawn(task.run(shutdown.clone())));
        }

        if task_handles.is_empty() {
            anyhow::bail!("No feed tasks were started. Check your live.toml configuration.");
        }

        tracing::info!(count = task_handles.len(), "All feed tasks have been spawned.");

        let results = future::join_all(task_handles).await;

        let mut failures = 0;
        for result in results {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::error!(error = %e, "Feed task terminated with an error.");
                }
                Err(e) => {
                    failures += 1;
                    tracing::error!(error = %e, "Feed task panicked or was aborted.");
                }
            }
        }

        if failures > 0 {
            anyhow::bail!("{failures} feed task(s) failed.");
        }
        tracing::info!("All feed tasks stopped.");
        Ok(())
    }
}
