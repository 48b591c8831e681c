// In crates/strategies/src/crossover.rs

use crate::error::{Error, Result};
use core_types::{Signal, SignalPoint};
use std::cmp::Ordering;

/// Walks a short-window and a long-window moving average side by side and
/// classifies every index.
///
/// * While either average is still NaN the point is undefined.
/// * Short above long is [`Signal::Long`], short below long is [`Signal::Short`].
/// * Equal averages carry the previous defined signal forward (undefined if
///   there is none yet).
/// * `is_crossover` is set when a signal differs from the most recent
///   defined one; the first defined signal never counts.
pub fn detect(short_ma: &[f64], long_ma: &[f64]) -> Result<Vec<SignalPoint>> {
    if short_ma.len() != long_ma.len() {
        return Err(Error::LengthMismatch { short: short_ma.len(), long: long_ma.len() });
    }

    let mut points = Vec::with_capacity(short_ma.len());
    let mut previous: Option<Signal> = None;

    for (index, (&short, &long)) in short_ma.iter().zip(long_ma).enumerate() {
        if short.is_nan() || long.is_nan() {
            points.push(SignalPoint { index, signal: None, is_crossover: false });
            continue;
        }

        let signal = match short.partial_cmp(&long) {
            Some(Ordering::Greater) => Some(Signal::Long),
            Some(Ordering::Less) => Some(Signal::Short),
            _ => previous,
        };
        let is_crossover = matches!((previous, signal), (Some(prev), Some(cur)) if prev != cur);

        if signal.is_some() {
            previous = signal;
        }
        points.push(SignalPoint { index, signal, is_crossover });
    }

    Ok(points)
}
