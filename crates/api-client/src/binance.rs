// In crates/api-client/src/binance.rs

use crate::connector::{Connector, Document};
use crate::error::{Error, Result};
use crate::normalizer::{from_batch_row, from_streaming_object};
use crate::venue::{DataHandler, Venue};
use app_config::VenueSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use core_types::timestamp::timestamp_from_json;
use core_types::{Candlestick, Symbol};
use serde_json::Value;

/// Where normalized bars from the kline stream go.
#[async_trait]
pub trait KlineSink: Send {
    /// A bar the venue marked final. Errors end the stream.
    async fn on_closed(&mut self, candle: Candlestick) -> anyhow::Result<()>;

    /// An in-progress bar, for live display only.
    fn on_update(&mut self, _candle: &Candlestick) {}
}

/// Stream topic for one pair's klines, e.g. `btcusdt@kline_1m`.
pub fn kline_topic(symbol: &Symbol, interval: &str) -> String {
    format!("{}@kline_{}", symbol.0.to_lowercase(), interval)
}

/// Fetches the venue's clock (`GET time`).
pub async fn server_time(connector: &Connector) -> Result<DateTime<Utc>> {
    let Document::Json(body) = connector.request("time", &[]).await? else {
        return Err(Error::UnexpectedResponse("empty body from time endpoint".into()));
    };
    let raw = body
        .get("serverTime")
        .ok_or_else(|| Error::UnexpectedResponse(format!("no serverTime in {body}")))?;

    timestamp_from_json(raw).map_err(|e| Error::Normalize(e.into()))
}

/// Fetches historical klines (`GET klines`).
///
/// The whole page is normalized or none of it is: one bad row fails the call.
///
/// # Arguments
///
/// * `symbol`: The pair to fetch; sent upper-cased.
/// * `interval`: The kline interval (e.g., "1m", "5m", "1h").
/// * `start_time`: Optional start time in milliseconds.
/// * `limit`: Optional number of klines to return (venue default 500, max 1000).
pub async fn klines(
    connector: &Connector,
    symbol: &Symbol,
    interval: &str,
    start_time: Option<i64>,
    limit: Option<u16>,
) -> Result<Vec<Candlestick>> {
    let symbol = Symbol::new(&symbol.0);
    let mut params = vec![("symbol", symbol.0.clone()), ("interval", interval.to_owned())];
    if let Some(st) = start_time {
        params.push(("startTime", st.to_string()));
    }
    if let Some(l) = limit {
        params.push(("limit", l.to_string()));
    }

    let rows = match connector.request("klines", &params).await? {
        Document::Empty => return Ok(Vec::new()),
        Document::Json(Value::Array(rows)) => rows,
        Document::Json(other) => {
            return Err(Error::UnexpectedResponse(format!("expected kline array, got {other}")));
        }
    };

    rows.iter()
        .map(|row| -> Result<Candlestick> {
            let fields = row.as_array().ok_or_else(|| {
                Error::UnexpectedResponse(format!("expected kline row array, got {row}"))
            })?;
            Ok(from_batch_row(fields, &symbol, interval)?)
        })
        .collect()
}

/// Binance market-data adapter: turns kline stream frames into candlesticks
/// and hands closed ones to its sink.
#[derive(Debug)]
pub struct Binance<S> {
    settings: VenueSettings,
    sink: S,
}

impl<S: KlineSink> Binance<S> {
    pub fn new(settings: VenueSettings, sink: S) -> Self {
        Self { settings, sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[async_trait]
impl<S: KlineSink> DataHandler for Binance<S> {
    async fn handle_data(&mut self, payload: &str) -> anyhow::Result<()> {
        // A single bad frame is dropped; the stream carries on.
        let event: Value = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, payload, "Dropping undecodable frame.");
                return Ok(());
            }
        };

        let Some(kline) = event.get("k").and_then(Value::as_object) else {
            tracing::debug!(payload, "Ignoring non-kline frame.");
            return Ok(());
        };

        let streamed = match from_streaming_object(kline) {
            Ok(streamed) => streamed,
            Err(e) => {
                tracing::warn!(error = %e, "Dropping malformed kline.");
                return Ok(());
            }
        };
        let is_closed = streamed.is_closed();

        let candle = match streamed.into_candlestick() {
            Ok(candle) => candle,
            Err(e) => {
                tracing::warn!(error = %e, is_closed, "Dropping incomplete kline.");
                return Ok(());
            }
        };

        if !is_closed {
            tracing::warn!(pair = %candle.pair, close = %candle.close, "Kline not closed yet, skipping.");
            self.sink.on_update(&candle);
            return Ok(());
        }

        tracing::info!(
            pair = %candle.pair,
            interval = %candle.interval,
            close_time = %candle.close_time,
            close = %candle.close,
            "Closed kline received."
        );
        self.sink.on_closed(candle).await
    }
}

impl<S: KlineSink> Venue for Binance<S> {
    fn settings(&self) -> &VenueSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        closed: Vec<Candlestick>,
        updates: usize,
        fail: bool,
    }

    #[async_trait]
    impl KlineSink for Recorder {
        async fn on_closed(&mut self, candle: Candlestick) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("store unavailable");
            }
            self.closed.push(candle);
            Ok(())
        }

        fn on_update(&mut self, _candle: &Candlestick) {
            self.updates += 1;
        }
    }

    fn settings(rest: &str) -> VenueSettings {
        VenueSettings {
            rest_base_url: rest.to_owned(),
            ws_base_url: "wss://stream.binance.com:9443".into(),
            api_version_path: "/api/v3".into(),
            ws_path: "/ws".into(),
            request_timeout_secs: 5,
            reconnect_delay_secs: 1,
        }
    }

    fn kline_event(closed: Option<bool>) -> String {
        let mut k = json!({
            "t": 1672515780000u64, "T": 1672515839999u64, "s": "BTCUSDT", "i": "1m",
            "o": "16500.10", "c": "16510.00", "h": "16520.00", "l": "16490.00",
            "v": "12.5", "n": 42, "q": "206375.5"
        });
        if let Some(x) = closed {
            k["x"] = json!(x);
        }
        json!({ "e": "kline", "E": 1672515782136u64, "s": "BTCUSDT", "k": k }).to_string()
    }

    #[test]
    fn topic_is_lower_case_symbol_and_interval() {
        assert_eq!(kline_topic(&Symbol::new("BTCUSDT"), "15m"), "btcusdt@kline_15m");
    }

    #[test]
    fn venue_urls_come_from_settings() {
        let venue = Binance::new(settings("https://api.binance.com"), Recorder::default());
        assert_eq!(venue.api_endpoint(), "https://api.binance.com/api/v3");
        assert_eq!(
            venue.stream_url("btcusdt@kline_1m"),
            "wss://stream.binance.com:9443/ws/btcusdt@kline_1m"
        );
    }

    #[tokio::test]
    async fn only_closed_klines_reach_the_sink() {
        let mut venue = Binance::new(settings("https://api.binance.com"), Recorder::default());

        venue.handle_data(&kline_event(None)).await.unwrap();
        venue.handle_data(&kline_event(Some(false))).await.unwrap();
        assert!(venue.sink().closed.is_empty());
        assert_eq!(venue.sink().updates, 2);

        venue.handle_data(&kline_event(Some(true))).await.unwrap();
        let sink = venue.into_sink();
        assert_eq!(sink.closed.len(), 1);
        assert_eq!(sink.closed[0].close, "16510.00");
        assert_eq!(sink.closed[0].close_time.timestamp(), 1672515839);
    }

    #[tokio::test]
    async fn garbage_frames_are_skipped() {
        let mut venue = Binance::new(settings("https://api.binance.com"), Recorder::default());

        venue.handle_data("not json").await.unwrap();
        venue.handle_data(r#"{"result":null,"id":1}"#).await.unwrap();
        venue.handle_data(r#"{"e":"kline","k":{"t":12,"x":true}}"#).await.unwrap();

        assert!(venue.sink().closed.is_empty());
        assert_eq!(venue.sink().updates, 0);
    }

    #[tokio::test]
    async fn sink_errors_propagate() {
        let recorder = Recorder { fail: true, ..Recorder::default() };
        let mut venue = Binance::new(settings("https://api.binance.com"), recorder);

        let err = venue.handle_data(&kline_event(Some(true))).await.unwrap_err();
        assert_eq!(err.to_string(), "store unavailable");
    }

    #[tokio::test]
    async fn klines_page_is_normalized() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("symbol".into(), "BNBUSDT".into()),
                mockito::Matcher::UrlEncoded("interval".into(), "5m".into()),
                mockito::Matcher::UrlEncoded("limit".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                json!([
                    [1499040000000u64, "0.01634790", "0.80000000", "0.01575800", "0.01577100",
                     "148976.11427815", 1499644799999u64, "2434.19055334", 308,
                     "1756.87402397", "28.46694368", "0"],
                    [1499644800000u64, "0.01577100", "0.01600000", "0.01500000", "0.01590000",
                     "1000.0", 1500249599999u64, "15.9", 12, "0", "0", "0"]
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let mut connector = Connector::new(&settings(&server.url()));
        connector.open().unwrap();

        let candles = klines(&connector, &Symbol("bnbusdt".into()), "5m", None, Some(2))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open, "0.01634790");
        assert_eq!(candles[1].open_time.timestamp(), 1499644800);
        connector.close().await;
    }

    #[tokio::test]
    async fn one_bad_row_fails_the_whole_page() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                json!([
                    [1499040000000u64, "1", "2", "0.5", "1.5", "10", 1499644799999u64, "15", 3],
                    [149904000000u64, "1", "2", "0.5", "1.5", "10", 1499644799999u64, "15", 3]
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let mut connector = Connector::new(&settings(&server.url()));
        connector.open().unwrap();

        let err = klines(&connector, &Symbol::new("BNBUSDT"), "5m", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Normalize(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn server_time_reads_the_clock() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v3/time")
            .with_status(200)
            .with_body(r#"{"serverTime":1499827319559}"#)
            .create_async()
            .await;

        let mut connector = Connector::new(&settings(&server.url()));
        connector.open().unwrap();

        let time = server_time(&connector).await.unwrap();
        assert_eq!(time.timestamp(), 1499827319);
    }
}
