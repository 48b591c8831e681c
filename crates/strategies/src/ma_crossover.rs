// In crates/strategies/src/ma_crossover.rs

use crate::crossover::detect;
use crate::error::Result;
use crate::indicators::moving_average;
use crate::types::CrossoverSettings;
use crate::Strategy;
use core_types::SignalPoint;
use std::time::Instant;

/// Golden/death cross detector over two moving averages of the close price.
#[derive(Debug, Clone)]
pub struct MACrossover {
    /// The configuration for this strategy instance.
    settings: CrossoverSettings,
}

impl MACrossover {
    /// Creates a new `MACrossover` from validated settings.
    pub fn new(settings: CrossoverSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &CrossoverSettings {
        &self.settings
    }

    /// Computes both moving averages over `closes` and runs the crossover scan.
    pub fn evaluate(&self, closes: &[f64]) -> Result<Vec<SignalPoint>> {
        let started = Instant::now();

        let short_ma = moving_average(self.settings.kind, closes, self.settings.short_window)?;
        let long_ma = moving_average(self.settings.kind, closes, self.settings.long_window)?;
        let points = detect(&short_ma, &long_ma)?;

        tracing::debug!(
            closes = closes.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Crossover scan finished."
        );

        Ok(points)
    }
}

impl Strategy for MACrossover {
    fn name(&self) -> &'static str {
        "MACrossover"
    }

    fn warm_up_len(&self) -> usize {
        self.settings.long_window
    }

    fn assess(&self, closes: &[f64]) -> Result<Option<SignalPoint>> {
        if closes.len() < self.warm_up_len() {
            return Ok(None); // Not enough data yet.
        }
        Ok(self.evaluate(closes)?.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::MovingAverageKind;
    use core_types::Signal;

    fn settings(short: usize, long: usize) -> CrossoverSettings {
        CrossoverSettings {
            short_window: short,
            long_window: long,
            kind: MovingAverageKind::Simple,
            history_size: 50,
            warmup_bars: 10,
        }
    }

    #[test]
    fn rejects_inverted_windows() {
        assert_eq!(
            MACrossover::new(settings(5, 5)).unwrap_err(),
            Error::InvalidWindows { short: 5, long: 5 }
        );
        assert_eq!(
            MACrossover::new(settings(0, 5)).unwrap_err(),
            Error::InvalidWindow { window: 0 }
        );
    }

    #[test]
    fn warm_up_is_undefined_then_signals_follow_the_trend() {
        let strategy = MACrossover::new(settings(2, 3)).unwrap();
        // Falling, then a sharp rally.
        let closes = [10.0, 9.0, 8.0, 7.0, 12.0, 15.0];

        let points = strategy.evaluate(&closes).unwrap();

        assert_eq!(points.len(), closes.len());
        assert_eq!(points[0].signal, None);
        assert_eq!(points[1].signal, None);
        assert_eq!(points[2].signal, Some(Signal::Short));
        assert!(!points[2].is_crossover);
        // sma2 = 9.5 vs sma3 = 9.0 at index 4.
        assert_eq!(points[4].signal, Some(Signal::Long));
        assert!(points[4].is_crossover);
        assert_eq!(points[5].signal, Some(Signal::Long));
        assert!(!points[5].is_crossover);
    }

    #[test]
    fn assess_waits_for_the_long_window() {
        let strategy = MACrossover::new(settings(2, 3)).unwrap();

        assert_eq!(strategy.assess(&[1.0, 2.0]).unwrap(), None);

        let latest = strategy.assess(&[1.0, 2.0, 3.0]).unwrap().unwrap();
        assert_eq!(latest.index, 2);
        assert_eq!(latest.signal, Some(Signal::Long));
    }

    #[test]
    fn exponential_kind_is_accepted() {
        let strategy = MACrossover::new(CrossoverSettings {
            kind: MovingAverageKind::Exponential,
            ..settings(3, 6)
        })
        .unwrap();

        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        let latest = strategy.assess(&closes).unwrap().unwrap();
        assert_eq!(latest.signal, Some(Signal::Long));
    }
}
