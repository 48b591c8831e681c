// In crates/engine/src/backfill.rs

use api_client::binance::klines;
use api_client::Connector;
use chrono::Utc;
use core_types::Symbol;
use database::CandlestickStore;
use std::time::Duration;
use tokio::time::sleep;

/// Largest page the klines endpoint serves.
pub const MAX_PAGE_LIMIT: u16 = 1000;

const PAGE_DELAY: Duration = Duration::from_millis(500);

/// Pages through historical klines from `start_time` (epoch millis) up to the
/// last closed bar, storing each page as one unit of work.
///
/// Returns how many bars were stored.
pub async fn backfill(
    connector: &Connector,
    store: &dyn CandlestickStore,
    symbol: &Symbol,
    interval: &str,
    start_time: Option<i64>,
    page_limit: u16,
) -> anyhow::Result<usize> {
    let page_limit = page_limit.clamp(1, MAX_PAGE_LIMIT);
    let mut current_start_time = start_time;
    let mut stored = 0;

    tracing::info!(%symbol, interval, ?start_time, "Starting backfill process.");

    loop {
        tracing::info!(?current_start_time, "Fetching batch of klines...");
        let page = klines(connector, symbol, interval, current_start_time, Some(page_limit)).await?;
        let fetched = page.len();

        // Bars still in progress are left for the live feed.
        let now = Utc::now();
        let closed: Vec<_> = page.into_iter().filter(|c| c.is_closed_at(now)).collect();

        let Some(last) = closed.last() else {
            tracing::info!("Reached the end of the historical data. Backfill complete.");
            break;
        };
        let next_start = last.open_time.timestamp_millis() + 1;

        tracing::info!(
            count = closed.len(),
            from = %closed[0].open_time,
            to = %last.open_time,
            "Received klines. Inserting into database."
        );

        let count = closed.len();
        store.save(closed.into()).await?;
        stored += count;

        if count < fetched || fetched < usize::from(page_limit) {
            tracing::info!(stored, "Caught up with the venue. Backfill complete.");
            break;
        }

        current_start_time = Some(next_start);
        sleep(PAGE_DELAY).await;
    }

    Ok(stored)
}
