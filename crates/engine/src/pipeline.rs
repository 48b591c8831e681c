// In crates/engine/src/pipeline.rs

use api_client::KlineSink;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::{Candlestick, SignalPoint, Symbol};
use database::CandlestickStore;
use std::collections::VecDeque;
use std::sync::Arc;
use strategies::Strategy;

/// Carries closed bars for one pair and interval to storage and then to the
/// strategy.
pub struct SignalPipeline {
    pair: Symbol,
    interval: String,
    store: Arc<dyn CandlestickStore>,
    strategy: Box<dyn Strategy + Send + Sync>,
    // The in-memory "hot" cache of recent closes, oldest first.
    closes: VecDeque<f64>,
    history_size: usize,
    last_open_time: Option<DateTime<Utc>>,
    last_point: Option<SignalPoint>,
}

impl SignalPipeline {
    pub fn new(
        pair: Symbol,
        interval: String,
        store: Arc<dyn CandlestickStore>,
        strategy: Box<dyn Strategy + Send + Sync>,
        history_size: usize,
    ) -> Self {
        Self {
            pair,
            interval,
            store,
            strategy,
            closes: VecDeque::with_capacity(history_size + 1),
            history_size,
            last_open_time: None,
            last_point: None,
        }
    }

    /// The newest point the strategy produced, if it has produced one.
    pub fn last_point(&self) -> Option<SignalPoint> {
        self.last_point
    }

    pub fn history_len(&self) -> usize {
        self.closes.len()
    }

    /// Stores a REST batch as one unit of work and seeds the close history.
    pub async fn warm_up(&mut self, candles: Vec<Candlestick>) -> anyhow::Result<()> {
        if candles.is_empty() {
            return Ok(());
        }
        let count = candles.len();
        self.store.save(candles.clone().into()).await?;
        for candle in &candles {
            self.remember(candle);
        }
        tracing::info!(pair = %self.pair, interval = %self.interval, count, "Warm-up history loaded.");
        self.evaluate();
        Ok(())
    }

    /// Persists one closed bar, then re-runs the strategy over the history.
    pub async fn ingest(&mut self, candle: Candlestick) -> anyhow::Result<Option<SignalPoint>> {
        if candle.pair != self.pair || candle.interval != self.interval {
            tracing::warn!(
                expected_pair = %self.pair,
                pair = %candle.pair,
                interval = %candle.interval,
                "Ignoring bar for another stream."
            );
            return Ok(None);
        }

        self.store.save(candle.clone().into()).await?;
        self.remember(&candle);
        Ok(self.evaluate())
    }

    fn remember(&mut self, candle: &Candlestick) {
        let Some(close) = candle.close_price() else {
            tracing::warn!(pair = %candle.pair, close = %candle.close, "Close price is not numeric, not scoring it.");
            return;
        };

        // A re-sent bar replaces the one it repeats.
        if self.last_open_time == Some(candle.open_time) {
            self.closes.pop_back();
        }
        self.closes.push_back(close);
        self.last_open_time = Some(candle.open_time);

        if self.closes.len() > self.history_size {
            self.closes.pop_front();
        }
    }

    fn evaluate(&mut self) -> Option<SignalPoint> {
        let history: Vec<f64> = self.closes.iter().copied().collect();

        let point = match self.strategy.assess(&history) {
            Ok(point) => point?,
            Err(e) => {
                tracing::warn!(error = %e, strategy = self.strategy.name(), "Strategy rejected the history.");
                return None;
            }
        };

        if point.is_crossover {
            tracing::info!(
                pair = %self.pair,
                interval = %self.interval,
                signal = ?point.signal,
                strategy = self.strategy.name(),
                "Crossover detected."
            );
        }
        self.last_point = Some(point);
        Some(point)
    }
}

#[async_trait]
impl KlineSink for SignalPipeline {
    async fn on_closed(&mut self, candle: Candlestick) -> anyhow::Result<()> {
        self.ingest(candle).await.map(|_| ())
    }

    fn on_update(&mut self, candle: &Candlestick) {
        tracing::trace!(pair = %candle.pair, close = %candle.close, "Live bar update.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_types::Signal;
    use database::{Entities, MemoryStore};
    use strategies::types::{CrossoverSettings, MovingAverageKind};
    use strategies::MACrossover;

    struct BrokenStore;

    #[async_trait]
    impl CandlestickStore for BrokenStore {
        async fn save(&self, _entities: Entities) -> database::Result<()> {
            Err(database::Error::OperationFailed(sqlx::Error::PoolClosed))
        }
    }

    fn bar(minute: i64, close: &str) -> Candlestick {
        let open = 1_700_000_000 + minute * 60;
        Candlestick {
            open_time: Utc.timestamp_opt(open, 0).unwrap(),
            close_time: Utc.timestamp_opt(open + 59, 0).unwrap(),
            open: close.into(),
            high: close.into(),
            low: close.into(),
            close: close.into(),
            volume: "1".into(),
            quote_volume: "1".into(),
            trade_count: 1,
            pair: Symbol::new("BTCUSDT"),
            interval: "1m".into(),
        }
    }

    fn pipeline(store: Arc<dyn CandlestickStore>, history_size: usize) -> SignalPipeline {
        let strategy = MACrossover::new(CrossoverSettings {
            short_window: 2,
            long_window: 3,
            kind: MovingAverageKind::Simple,
            history_size,
            warmup_bars: 0,
        })
        .unwrap();
        SignalPipeline::new(Symbol::new("BTCUSDT"), "1m".into(), store, Box::new(strategy), history_size)
    }

    #[tokio::test]
    async fn closed_bars_are_stored_then_scored() {
        let store = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(store.clone(), 10);

        assert_eq!(pipeline.ingest(bar(0, "10")).await.unwrap(), None);
        assert_eq!(pipeline.ingest(bar(1, "9")).await.unwrap(), None);

        let first = pipeline.ingest(bar(2, "8")).await.unwrap().unwrap();
        assert_eq!(first.signal, Some(Signal::Short));
        assert!(!first.is_crossover);

        pipeline.ingest(bar(3, "7")).await.unwrap();
        let cross = pipeline.ingest(bar(4, "12")).await.unwrap().unwrap();
        assert_eq!(cross.signal, Some(Signal::Long));
        assert!(cross.is_crossover);
        assert_eq!(pipeline.last_point(), Some(cross));

        assert_eq!(store.batches().len(), 5);
        assert!(store.batches().iter().all(|batch| batch.len() == 1));
    }

    #[tokio::test]
    async fn warm_up_is_one_batch_and_seeds_history() {
        let store = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(store.clone(), 10);

        pipeline
            .warm_up(vec![bar(0, "1"), bar(1, "2"), bar(2, "3")])
            .await
            .unwrap();

        assert_eq!(store.batches().len(), 1);
        assert_eq!(store.batches()[0].len(), 3);
        assert_eq!(pipeline.history_len(), 3);
        assert_eq!(pipeline.last_point().unwrap().signal, Some(Signal::Long));
    }

    #[tokio::test]
    async fn history_is_bounded_and_repeats_replace() {
        let store = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(store.clone(), 3);

        for minute in 0..5 {
            pipeline.ingest(bar(minute, "1")).await.unwrap();
        }
        assert_eq!(pipeline.history_len(), 3);

        pipeline.ingest(bar(4, "2")).await.unwrap();
        assert_eq!(pipeline.history_len(), 3);
    }

    #[tokio::test]
    async fn foreign_bars_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(store.clone(), 10);

        let other = Candlestick { pair: Symbol::new("ETHUSDT"), ..bar(0, "1") };
        assert_eq!(pipeline.ingest(other).await.unwrap(), None);
        assert!(store.batches().is_empty());
    }

    #[tokio::test]
    async fn storage_errors_surface_unchanged() {
        let mut pipeline = pipeline(Arc::new(BrokenStore), 10);

        let err = pipeline.on_closed(bar(0, "1")).await.unwrap_err();
        assert!(err.downcast_ref::<database::Error>().is_some());
        assert_eq!(pipeline.history_len(), 0);
    }
}
