// In crates/core-types/src/types.rs

use chrono::{DateTime, TimeDelta, Utc};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A trading pair identifier, always held in upper case (e.g. "BTCUSDT").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().to_uppercase())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One closed (or in-progress) price bar for a pair and interval.
///
/// Prices and volumes are kept as the exact decimal strings the venue sent.
/// Instants serialize as integer epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candlestick {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub open_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub close_time: DateTime<Utc>,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
    pub quote_volume: String,
    pub trade_count: u64,
    pub pair: Symbol,
    pub interval: String,
}

impl Candlestick {
    /// Checks `high >= max(open, close)` and `low <= min(open, close)`.
    ///
    /// Returns `None` when any of the four prices does not parse as a decimal.
    pub fn price_bounds_hold(&self) -> Option<bool> {
        let open = Decimal::from_str(&self.open).ok()?;
        let high = Decimal::from_str(&self.high).ok()?;
        let low = Decimal::from_str(&self.low).ok()?;
        let close = Decimal::from_str(&self.close).ok()?;

        Some(high >= open.max(close) && low <= open.min(close))
    }

    /// Whether the bar had finished by `now`.
    ///
    /// `close_time` is held to the second while the venue closes bars on the
    /// last millisecond (`...59.999`), so the bar only counts as finished one
    /// second later.
    pub fn is_closed_at(&self, now: DateTime<Utc>) -> bool {
        self.close_time + TimeDelta::seconds(1) <= now
    }

    /// The closing price as a float, for indicator maths only.
    pub fn close_price(&self) -> Option<f64> {
        Decimal::from_str(&self.close).ok()?.to_f64()
    }
}

/// Direction implied by the relative position of two moving averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Long,
    Short,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => f.write_str("long"),
            Signal::Short => f.write_str("short"),
        }
    }
}

/// One entry of a crossover scan, aligned with the input series by `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub index: usize,
    /// `None` during the moving-average warm-up period.
    pub signal: Option<Signal>,
    pub is_crossover: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Candlestick {
        Candlestick {
            open_time: Utc.timestamp_opt(1499040000, 0).unwrap(),
            close_time: Utc.timestamp_opt(1499644799, 0).unwrap(),
            open: "0.01634790".into(),
            high: "0.80000000".into(),
            low: "0.01575800".into(),
            close: "0.01577100".into(),
            volume: "148976.11427815".into(),
            quote_volume: "2434.19055334".into(),
            trade_count: 308,
            pair: Symbol::new("bnbusdt"),
            interval: "5m".into(),
        }
    }

    #[test]
    fn symbols_are_upper_cased() {
        assert_eq!(Symbol::new("ethBtc").0, "ETHBTC");
    }

    #[test]
    fn external_json_uses_epoch_seconds_and_exact_strings() {
        let value = serde_json::to_value(sample()).unwrap();

        assert_eq!(
            value,
            json!({
                "open_time": 1499040000,
                "close_time": 1499644799,
                "open": "0.01634790",
                "high": "0.80000000",
                "low": "0.01575800",
                "close": "0.01577100",
                "volume": "148976.11427815",
                "quote_volume": "2434.19055334",
                "trade_count": 308,
                "pair": "BNBUSDT",
                "interval": "5m"
            })
        );
    }

    #[test]
    fn bar_is_open_through_its_last_second() {
        let candle = sample();
        let last_second = Utc.timestamp_opt(1499644799, 500_000_000).unwrap();
        let next_bar = Utc.timestamp_opt(1499644800, 0).unwrap();

        assert!(!candle.is_closed_at(candle.close_time));
        assert!(!candle.is_closed_at(last_second));
        assert!(candle.is_closed_at(next_bar));
    }

    #[test]
    fn price_bounds() {
        let candle = sample();
        assert_eq!(candle.price_bounds_hold(), Some(true));

        let inverted = Candlestick { high: "0.01000000".into(), ..sample() };
        assert_eq!(inverted.price_bounds_hold(), Some(false));

        let garbled = Candlestick { low: "n/a".into(), ..sample() };
        assert_eq!(garbled.price_bounds_hold(), None);
    }

    #[test]
    fn close_price_parses_decimal_string() {
        let close = sample().close_price().unwrap();
        assert!((close - 0.015771).abs() < 1e-12);
        assert_eq!(Candlestick { close: "".into(), ..sample() }.close_price(), None);
    }
}
