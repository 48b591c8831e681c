// In crates/strategies/src/types.rs

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Which moving average feeds the crossover scan.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MovingAverageKind {
    #[default]
    Simple,
    Exponential,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CrossoverSettings {
    pub short_window: usize,
    pub long_window: usize,
    #[serde(default)]
    pub kind: MovingAverageKind,

    // How many closes the live pipeline keeps in memory.
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    // How many closed bars to pull over REST before streaming starts.
    #[serde(default = "default_warmup_bars")]
    pub warmup_bars: u16,
}

impl CrossoverSettings {
    pub fn validate(&self) -> Result<()> {
        if self.short_window == 0 {
            return Err(Error::InvalidWindow { window: self.short_window });
        }
        if self.short_window >= self.long_window {
            return Err(Error::InvalidWindows { short: self.short_window, long: self.long_window });
        }
        if self.history_size < self.long_window {
            return Err(Error::HistoryTooSmall { history: self.history_size, long: self.long_window });
        }
        Ok(())
    }
}

fn default_history_size() -> usize { 200 }
fn default_warmup_bars() -> u16 { 100 }
