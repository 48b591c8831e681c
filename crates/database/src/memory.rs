// In crates/database/src/memory.rs

use crate::{CandlestickStore, Entities, Result};
use async_trait::async_trait;
use core_types::Candlestick;
use std::sync::Mutex;

/// Keeps every committed batch in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    batches: Mutex<Vec<Vec<Candlestick>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each committed unit of work, in commit order.
    pub fn batches(&self) -> Vec<Vec<Candlestick>> {
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Every stored bar, flattened in commit order.
    pub fn candlesticks(&self) -> Vec<Candlestick> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl CandlestickStore for MemoryStore {
    async fn save(&self, entities: Entities) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }
        let batch = entities.into_vec();
        self.batches.lock().unwrap_or_else(|e| e.into_inner()).push(batch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use core_types::Symbol;

    fn candle(open_secs: i64) -> Candlestick {
        Candlestick {
            open_time: Utc.timestamp_opt(open_secs, 0).unwrap(),
            close_time: Utc.timestamp_opt(open_secs + 59, 0).unwrap(),
            open: "1.0".into(),
            high: "2.0".into(),
            low: "0.5".into(),
            close: "1.5".into(),
            volume: "10".into(),
            quote_volume: "15".into(),
            trade_count: 3,
            pair: Symbol::new("BTCUSDT"),
            interval: "1m".into(),
        }
    }

    #[tokio::test]
    async fn single_and_batch_saves_are_separate_units_of_work() {
        let store = MemoryStore::new();

        store.save(candle(1_700_000_000).into()).await.unwrap();
        store
            .save(vec![candle(1_700_000_060), candle(1_700_000_120)].into())
            .await
            .unwrap();

        let batches = store.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[1].len(), 2);
        assert_eq!(store.candlesticks()[2].open_time.timestamp(), 1_700_000_120);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let store = MemoryStore::new();
        store.save(Vec::<Candlestick>::new().into()).await.unwrap();
        assert!(store.batches().is_empty());
    }

    #[test]
    fn entities_flatten_in_order() {
        let many: Entities = vec![candle(1_700_000_000), candle(1_700_000_060)].into();
        assert_eq!(many.len(), 2);
        let flat = many.into_vec();
        assert!(flat[0].open_time < flat[1].open_time);
    }
}
