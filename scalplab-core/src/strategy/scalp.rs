//! RSI/ATR trend-filtered scalp: buy a short-momentum bounce inside an uptrend.

use super::{BarView, ExitLevels, PreparedBars, Signal, Strategy, StrategyConfig};
use crate::domain::Bar;
use crate::engine::precompute::{compute_warmup, precompute_indicators};
use crate::indicators::{Atr, Indicator, Rsi, Sma};
use chrono::Duration;

pub const MOMENTUM_PERIOD: usize = 3;
pub const VOLATILITY_PERIOD: usize = 14;
pub const TREND_PERIOD: usize = 200;

/// Bars skipped before the first entry can be considered.
pub const WARMUP_BARS: usize = 200;

/// Long-only scalp.
///
/// Entry: close above the trend SMA, ATR above `min_volatility`, and RSI
/// crossing up through `momentum_threshold` between the previous and current bar.
/// Exits are ATR multiples of the entry-time reading.
pub struct ScalpStrategy {
    config: StrategyConfig,
    indicators: Vec<Box<dyn Indicator>>,
    momentum_key: String,
    volatility_key: String,
    trend_key: String,
}

impl ScalpStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        let momentum = Rsi::new(MOMENTUM_PERIOD);
        let volatility = Atr::new(VOLATILITY_PERIOD);
        let trend = Sma::new(TREND_PERIOD);
        Self {
            momentum_key: momentum.name().to_string(),
            volatility_key: volatility.name().to_string(),
            trend_key: trend.name().to_string(),
            indicators: vec![Box::new(momentum), Box::new(volatility), Box::new(trend)],
            config,
        }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn momentum(&self, row: &BarView<'_>) -> f64 {
        row.value(&self.momentum_key)
    }

    pub fn volatility(&self, row: &BarView<'_>) -> f64 {
        row.value(&self.volatility_key)
    }

    pub fn trend(&self, row: &BarView<'_>) -> f64 {
        row.value(&self.trend_key)
    }
}

impl std::fmt::Debug for ScalpStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScalpStrategy")
            .field("config", &self.config)
            .finish()
    }
}

impl Strategy for ScalpStrategy {
    fn name(&self) -> &str {
        "rsi_atr_scalp"
    }

    fn warmup_bars(&self) -> usize {
        WARMUP_BARS.max(compute_warmup(&self.indicators) + 1)
    }

    fn prepare(&self, bars: &[Bar]) -> PreparedBars {
        let columns = precompute_indicators(bars, &self.indicators);
        PreparedBars::new(bars.to_vec(), columns)
    }

    fn signal(&self, current: &BarView<'_>, previous: &BarView<'_>) -> Signal {
        // NaN fails every comparison below, so undefined columns read as HOLD.
        let in_uptrend = current.bar.close > self.trend(current);
        let volatile_enough = self.volatility(current) > self.config.min_volatility;
        let threshold = self.config.momentum_threshold;
        let crossed_up = self.momentum(previous) < threshold && self.momentum(current) >= threshold;

        if in_uptrend && volatile_enough && crossed_up {
            Signal::Buy
        } else {
            Signal::Hold
        }
    }

    fn exit_levels(&self, current: &BarView<'_>, entry_price: f64) -> ExitLevels {
        let atr = self.volatility(current);
        let trail = atr * self.config.trailing_multiple;
        ExitLevels {
            tp1: entry_price + atr * self.config.near_tp_multiple,
            tp2: entry_price + atr * self.config.far_tp_multiple,
            stop: entry_price - trail,
            trail_distance: (self.config.far_tp_multiple != 0.0).then_some(trail),
        }
    }

    fn cooldown(&self) -> Duration {
        self.config.cooldown()
    }
}
