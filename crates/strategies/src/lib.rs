// In crates/strategies/src/lib.rs

use core_types::SignalPoint;

pub mod crossover;
pub mod error;
pub mod indicators;
pub mod ma_crossover;
pub mod types;

// Re-export public types
pub use crossover::detect;
pub use error::{Error, Result};
pub use ma_crossover::MACrossover;

/// The universal interface for a signal-producing strategy.
///
/// A strategy is handed the full close-price history for one pair and
/// interval on every call and rebuilds its view from scratch, so it carries
/// no hidden state between calls.
pub trait Strategy {
    /// The name of the strategy.
    fn name(&self) -> &'static str;

    /// The minimum number of closes before the strategy can emit anything.
    fn warm_up_len(&self) -> usize;

    /// Scans `closes` (oldest first) and returns the point for the newest close.
    fn assess(&self, closes: &[f64]) -> Result<Option<SignalPoint>>;
}
