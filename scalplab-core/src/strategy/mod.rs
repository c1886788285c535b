//! Strategy contract — indicator preparation, entry signal, exit levels.
//!
//! A strategy never sees engine state. It receives bars plus its own
//! precomputed indicator columns and answers two questions: should the engine
//! buy on this bar, and where do the exits sit for a given entry price.

pub mod config;
pub mod scalp;

pub use config::{StrategyConfig, StrategyConfigError};
pub use scalp::ScalpStrategy;

use crate::domain::Bar;
use crate::indicators::IndicatorValues;
use chrono::Duration;

/// Per-bar entry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Hold,
}

/// Exit geometry computed once, at entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitLevels {
    /// Near take-profit: half the position closes here.
    pub tp1: f64,
    /// Far take-profit: the remainder closes here.
    pub tp2: f64,
    /// Initial stop.
    pub stop: f64,
    /// Fixed distance the stop trails below the high-water mark.
    /// `None` disables trailing for the life of the position.
    pub trail_distance: Option<f64>,
}

/// Bars plus the indicator columns a strategy derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedBars {
    bars: Vec<Bar>,
    columns: IndicatorValues,
}

impl PreparedBars {
    pub fn new(bars: Vec<Bar>, columns: IndicatorValues) -> Self {
        Self { bars, columns }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn columns(&self) -> &IndicatorValues {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Row view at `index`. Panics if out of range.
    pub fn row(&self, index: usize) -> BarView<'_> {
        BarView {
            index,
            bar: &self.bars[index],
            columns: &self.columns,
        }
    }
}

/// One bar with access to its derived columns.
#[derive(Debug, Clone, Copy)]
pub struct BarView<'a> {
    pub index: usize,
    pub bar: &'a Bar,
    columns: &'a IndicatorValues,
}

impl<'a> BarView<'a> {
    /// Derived column at this bar; NaN when undefined or absent.
    pub fn value(&self, column: &str) -> f64 {
        self.columns.value_or_nan(column, self.index)
    }
}

/// Trait for strategies driven by the trade engine.
pub trait Strategy: Send + Sync {
    /// Human-readable name (e.g., "rsi_atr_scalp").
    fn name(&self) -> &str;

    /// Minimum number of leading bars whose indicators may be undefined.
    fn warmup_bars(&self) -> usize;

    /// Attach indicator columns. Idempotent: preparing the same bars twice yields
    /// identical output.
    fn prepare(&self, bars: &[Bar]) -> PreparedBars;

    /// Entry decision for `current`, given the bar before it.
    fn signal(&self, current: &BarView<'_>, previous: &BarView<'_>) -> Signal;

    /// Exit levels for a position opened at `entry_price` on `current`.
    fn exit_levels(&self, current: &BarView<'_>, entry_price: f64) -> ExitLevels;

    /// No-entry interval after a full exit.
    fn cooldown(&self) -> Duration;
}
