// In crates/api-client/src/normalizer.rs

use crate::error::NormalizeError;
use chrono::{DateTime, Utc};
use core_types::timestamp::timestamp_from_json;
use core_types::{Candlestick, Symbol};
use serde_json::{Map, Value};

/// The REST kline row carries more columns than a candlestick models; only
/// the first nine are read.
pub const BATCH_ROW_FIELDS: usize = 9;

type NormalizeResult<T> = std::result::Result<T, NormalizeError>;

/// Builds a candlestick from one row of the REST kline batch.
///
/// Row layout: `[open_time_ms, open, high, low, close, volume, close_time_ms,
/// quote_volume, trade_count, ...]`. Anything past index 8 is ignored.
pub fn from_batch_row(row: &[Value], pair: &Symbol, interval: &str) -> NormalizeResult<Candlestick> {
    if row.len() < BATCH_ROW_FIELDS {
        return Err(NormalizeError::ShortRow { len: row.len() });
    }

    let candle = Candlestick {
        open_time: timestamp_from_json(&row[0])?,
        open: decimal_string("open", &row[1])?,
        high: decimal_string("high", &row[2])?,
        low: decimal_string("low", &row[3])?,
        close: decimal_string("close", &row[4])?,
        volume: decimal_string("volume", &row[5])?,
        close_time: timestamp_from_json(&row[6])?,
        quote_volume: decimal_string("quote_volume", &row[7])?,
        trade_count: count("trade_count", &row[8])?,
        pair: Symbol::new(&pair.0),
        interval: interval.to_owned(),
    };

    check_times(candle.open_time, candle.close_time)?;
    check_price_bounds(&candle);
    Ok(candle)
}

/// A kline object from the stream (`"k"` of a kline event).
///
/// Every field is optional: a key the venue left out stays `None` instead of
/// failing the whole frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingKline {
    pub open_time: Option<DateTime<Utc>>,
    pub close_time: Option<DateTime<Utc>>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub volume: Option<String>,
    pub quote_volume: Option<String>,
    pub trade_count: Option<u64>,
    pub pair: Option<Symbol>,
    pub interval: Option<String>,
    pub is_closed: Option<bool>,
}

impl StreamingKline {
    /// Only a bar the venue marked final (`"x": true`) may be stored or scored.
    pub fn is_closed(&self) -> bool {
        self.is_closed == Some(true)
    }

    /// Completes the bar, naming the first wire key that is absent.
    pub fn into_candlestick(self) -> NormalizeResult<Candlestick> {
        let candle = Candlestick {
            open_time: self.open_time.ok_or(missing("t"))?,
            close_time: self.close_time.ok_or(missing("T"))?,
            open: self.open.ok_or(missing("o"))?,
            high: self.high.ok_or(missing("h"))?,
            low: self.low.ok_or(missing("l"))?,
            close: self.close.ok_or(missing("c"))?,
            volume: self.volume.ok_or(missing("v"))?,
            quote_volume: self.quote_volume.ok_or(missing("q"))?,
            trade_count: self.trade_count.ok_or(missing("n"))?,
            pair: self.pair.ok_or(missing("s"))?,
            interval: self.interval.ok_or(missing("i"))?,
        };

        check_times(candle.open_time, candle.close_time)?;
        check_price_bounds(&candle);
        Ok(candle)
    }
}

/// Reads keys `t o h l c v T q n s i x` out of a streaming kline object.
///
/// Absent (or null) keys become `None`. A key that is present but malformed
/// is an error; a timestamp of the wrong width fails with
/// [`NormalizeError::Timestamp`].
pub fn from_streaming_object(obj: &Map<String, Value>) -> NormalizeResult<StreamingKline> {
    let field = |key: &str| obj.get(key).filter(|v| !v.is_null());

    Ok(StreamingKline {
        open_time: field("t").map(timestamp_from_json).transpose()?,
        close_time: field("T").map(timestamp_from_json).transpose()?,
        open: field("o").map(|v| decimal_string("o", v)).transpose()?,
        high: field("h").map(|v| decimal_string("h", v)).transpose()?,
        low: field("l").map(|v| decimal_string("l", v)).transpose()?,
        close: field("c").map(|v| decimal_string("c", v)).transpose()?,
        volume: field("v").map(|v| decimal_string("v", v)).transpose()?,
        quote_volume: field("q").map(|v| decimal_string("q", v)).transpose()?,
        trade_count: field("n").map(|v| count("n", v)).transpose()?,
        pair: field("s").map(|v| text("s", v).map(Symbol::new)).transpose()?,
        interval: field("i").map(|v| text("i", v)).transpose()?,
        is_closed: field("x")
            .map(|v| v.as_bool().ok_or_else(|| wrong_type("x", v)))
            .transpose()?,
    })
}

/// Keeps the venue's decimal text verbatim.
///
/// JSON numbers are rejected: serde_json has already parsed them as `f64`,
/// so their digits can no longer be trusted.
fn decimal_string(field: &'static str, value: &Value) -> NormalizeResult<String> {
    value.as_str().map(str::to_owned).ok_or_else(|| wrong_type(field, value))
}

fn text(field: &'static str, value: &Value) -> NormalizeResult<String> {
    value.as_str().map(str::to_owned).ok_or_else(|| wrong_type(field, value))
}

fn count(field: &'static str, value: &Value) -> NormalizeResult<u64> {
    value.as_u64().ok_or_else(|| wrong_type(field, value))
}

fn missing(field: &'static str) -> NormalizeError {
    NormalizeError::MissingField { field }
}

fn wrong_type(field: &'static str, value: &Value) -> NormalizeError {
    NormalizeError::WrongType { field, found: value.to_string() }
}

fn check_times(open_time: DateTime<Utc>, close_time: DateTime<Utc>) -> NormalizeResult<()> {
    if close_time < open_time {
        return Err(NormalizeError::InvertedTimes { open_time, close_time });
    }
    Ok(())
}

// The venue does not guarantee OHLC consistency; flag it and keep the bar.
fn check_price_bounds(candle: &Candlestick) {
    if candle.price_bounds_hold() == Some(false) {
        tracing::warn!(
            pair = %candle.pair,
            interval = %candle.interval,
            open_time = %candle.open_time,
            open = %candle.open,
            high = %candle.high,
            low = %candle.low,
            close = %candle.close,
            "Candlestick high/low do not bound open/close."
        );
    }
}
