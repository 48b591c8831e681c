// In crates/strategies/src/indicators.rs

use crate::error::{Error, Result};
use crate::types::MovingAverageKind;
use ta::indicators::{ExponentialMovingAverage as Ema, SimpleMovingAverage as Sma};
use ta::Next;

/// Simple moving average over `window` closes.
///
/// The output has the same length as `prices`; the first `window - 1`
/// entries are NaN.
pub fn sma(prices: &[f64], window: usize) -> Result<Vec<f64>> {
    let mut indicator = Sma::new(window).map_err(|_| Error::InvalidWindow { window })?;
    Ok(mask_warm_up(prices.iter().map(|&p| indicator.next(p)), window))
}

/// Exponential moving average over `window` closes, NaN-padded like [`sma`].
pub fn ema(prices: &[f64], window: usize) -> Result<Vec<f64>> {
    let mut indicator = Ema::new(window).map_err(|_| Error::InvalidWindow { window })?;
    Ok(mask_warm_up(prices.iter().map(|&p| indicator.next(p)), window))
}

pub fn moving_average(kind: MovingAverageKind, prices: &[f64], window: usize) -> Result<Vec<f64>> {
    match kind {
        MovingAverageKind::Simple => sma(prices, window),
        MovingAverageKind::Exponential => ema(prices, window),
    }
}

fn mask_warm_up(values: impl Iterator<Item = f64>, window: usize) -> Vec<f64> {
    values
        .enumerate()
        .map(|(i, value)| if i + 1 < window { f64::NAN } else { value })
        .collect()
}
