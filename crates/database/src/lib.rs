// In crates/database/src/lib.rs

use app_config::DatabaseSettings;
use async_trait::async_trait;
use core_types::Candlestick;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub mod error;
pub mod memory;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use memory::MemoryStore;

/// What a single `save` call persists: one bar or an ordered batch of bars.
#[derive(Debug, Clone, PartialEq)]
pub enum Entities {
    One(Candlestick),
    Many(Vec<Candlestick>),
}

impl Entities {
    pub fn len(&self) -> usize {
        match self {
            Entities::One(_) => 1,
            Entities::Many(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_vec(self) -> Vec<Candlestick> {
        match self {
            Entities::One(item) => vec![item],
            Entities::Many(items) => items,
        }
    }
}

impl From<Candlestick> for Entities {
    fn from(item: Candlestick) -> Self {
        Entities::One(item)
    }
}

impl From<Vec<Candlestick>> for Entities {
    fn from(items: Vec<Candlestick>) -> Self {
        Entities::Many(items)
    }
}

/// Durable storage for candlesticks.
///
/// Every call is one unit of work: either all of `entities` are stored or
/// none are. Errors are handed back untouched.
#[async_trait]
pub trait CandlestickStore: Send + Sync {
    async fn save(&self, entities: Entities) -> Result<()>;
}

/// A wrapper around the `sqlx` connection pool.
#[derive(Debug, Clone)]
pub struct Db(PgPool);

/// Establishes a connection pool to the PostgreSQL database and runs migrations.
///
/// # Arguments
///
/// * `settings`: The database configuration settings.
///
/// # Returns
///
/// A `Result` containing the `Db` wrapper on success, or an `Error` on failure.
pub async fn connect(settings: &DatabaseSettings) -> Result<Db> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.url)
        .await?;

    // Run database migrations. This ensures the database schema is up-to-date.
    sqlx::migrate!("../../migrations").run(&pool).await?;

    Ok(Db(pool))
}

impl Db {
    /// Closes every pooled connection. Pending `save` calls finish first.
    pub async fn close(&self) {
        self.0.close().await;
    }
}

#[async_trait]
impl CandlestickStore for Db {
    async fn save(&self, entities: Entities) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }

        let count = entities.len();
        let mut tx = self.0.begin().await.map_err(Error::OperationFailed)?;

        for candle in entities.into_vec() {
            // A re-sent bar for the same (pair, interval, open_time) overwrites the earlier one.
            sqlx::query(
                r#"
                INSERT INTO candlestick
                    (open_time, close_time, open, high, low, close, volume, quote_volume, trade_count, pair, interval)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ON CONFLICT (pair, interval, open_time) DO UPDATE SET
                    close_time = EXCLUDED.close_time,
                    open = EXCLUDED.open,
                    high = EXCLUDED.high,
                    low = EXCLUDED.low,
                    close = EXCLUDED.close,
                    volume = EXCLUDED.volume,
                    quote_volume = EXCLUDED.quote_volume,
                    trade_count = EXCLUDED.trade_count
                "#,
            )
            .bind(candle.open_time.naive_utc())
            .bind(candle.close_time.naive_utc())
            .bind(candle.open)
            .bind(candle.high)
            .bind(candle.low)
            .bind(candle.close)
            .bind(candle.volume)
            .bind(candle.quote_volume)
            .bind(trade_count_column(candle.trade_count)?)
            .bind(candle.pair.0)
            .bind(candle.interval)
            .execute(&mut *tx)
            .await
            .map_err(Error::OperationFailed)?;
        }

        tx.commit().await.map_err(Error::OperationFailed)?;
        tracing::debug!(count, "Committed candlestick batch.");

        Ok(())
    }
}

// `trade_count` is a BIGINT column.
fn trade_count_column(count: u64) -> Result<i64> {
    i64::try_from(count).map_err(|_| Error::ValueOutOfRange { field: "trade_count", value: count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trade_count_beyond_bigint_is_an_error() {
        assert_eq!(trade_count_column(308).unwrap(), 308);
        assert_eq!(trade_count_column(i64::MAX as u64).unwrap(), i64::MAX);
        match trade_count_column(u64::MAX) {
            Err(Error::ValueOutOfRange { field, value }) => {
                assert_eq!(field, "trade_count");
                assert_eq!(value, u64::MAX);
            }
            other => panic!("expected an out-of-range error, got {other:?}"),
        }
    }
}
