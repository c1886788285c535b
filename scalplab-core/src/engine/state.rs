//! Engine configuration, per-run mutable state, and the run result.

use crate::domain::{Bar, TradeKind, TradeLogEntry};
use crate::metrics::Metrics;
use crate::strategy::ExitLevels;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineConfigError {
    #[error("starting equity must be > 0, got {0}")]
    StartingEquity(f64),
    #[error("risk per trade must be in (0, 1], got {0}")]
    RiskPerTrade(f64),
    #[error("fee rate must be >= 0, got {0}")]
    FeeRate(f64),
}

/// Account-level settings for one simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub starting_equity: f64,
    /// Fee charged on exit notional (0.001 = 0.1%).
    pub fee_rate: f64,
    /// Fraction of current equity put at risk between entry and initial stop.
    pub risk_per_trade: f64,
    /// Minimum number of leading bars skipped before trading. The strategy may
    /// require more.
    pub warmup_bars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_equity: 1_000.0,
            fee_rate: 0.001,
            risk_per_trade: 0.01,
            warmup_bars: 200,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if !(self.starting_equity > 0.0) {
            return Err(EngineConfigError::StartingEquity(self.starting_equity));
        }
        if !(self.risk_per_trade > 0.0 && self.risk_per_trade <= 1.0) {
            return Err(EngineConfigError::RiskPerTrade(self.risk_per_trade));
        }
        if !(self.fee_rate >= 0.0) {
            return Err(EngineConfigError::FeeRate(self.fee_rate));
        }
        Ok(())
    }
}

/// An open long position.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub stop_price: f64,
    pub tp1_price: f64,
    pub tp2_price: f64,
    pub remaining_size: f64,
    pub partial_taken: bool,
    pub high_water_mark: f64,
    /// Entry-time volatility times the trailing multiple. Never recomputed.
    pub trail_distance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Entered(OpenPosition),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }
}

/// Mutable state owned by exactly one run.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub equity: f64,
    pub position: PositionState,
    pub cooldown_until: Option<NaiveDateTime>,
    pub equity_curve: Vec<f64>,
    pub trade_log: Vec<TradeLogEntry>,
}

impl EngineState {
    pub fn new(starting_equity: f64) -> Self {
        Self {
            equity: starting_equity,
            position: PositionState::Flat,
            cooldown_until: None,
            equity_curve: vec![starting_equity],
            trade_log: Vec::new(),
        }
    }

    pub fn in_cooldown(&self, time: NaiveDateTime) -> bool {
        self.cooldown_until.is_some_and(|until| time < until)
    }

    pub fn record_equity(&mut self) {
        self.equity_curve.push(self.equity);
    }

    /// Open a position at `bar.close`. Zero or negative risk opens a zero-size position.
    pub fn open(&mut self, bar: &Bar, levels: ExitLevels, risk_per_trade: f64) {
        let entry_price = bar.close;
        let risk_per_unit = entry_price - levels.stop;
        let size = if risk_per_unit > 0.0 {
            self.equity * risk_per_trade / risk_per_unit
        } else {
            0.0
        };
        self.position = PositionState::Entered(OpenPosition {
            entry_time: bar.time,
            entry_price,
            stop_price: levels.stop,
            tp1_price: levels.tp1,
            tp2_price: levels.tp2,
            remaining_size: size,
            partial_taken: false,
            high_water_mark: entry_price,
            trail_distance: levels.trail_distance,
        });
    }

    /// Trail the stop, take the partial, then check the final exit.
    ///
    /// The far target is checked before the stop: when one bar's range
    /// touches both, the favourable exit wins.
    pub fn manage(&mut self, bar: &Bar, fee_rate: f64, cooldown: Duration) {
        let PositionState::Entered(pos) = &mut self.position else {
            return;
        };

        pos.high_water_mark = pos.high_water_mark.max(bar.high);
        if let Some(distance) = pos.trail_distance {
            pos.stop_price = pos.stop_price.max(pos.high_water_mark - distance);
        }

        if !pos.partial_taken && bar.high >= pos.tp1_price {
            let half = pos.remaining_size / 2.0;
            let (gain, fee) = realize(pos.entry_price, pos.tp1_price, half, fee_rate);
            self.equity += gain;
            self.trade_log.push(TradeLogEntry {
                time: bar.time,
                entry_time: pos.entry_time,
                kind: TradeKind::PartialWin,
                entry_price: pos.entry_price,
                exit_price: pos.tp1_price,
                gain,
                fee,
                size: half,
            });
            pos.remaining_size -= half;
            pos.partial_taken = true;
            pos.stop_price = pos.entry_price;
        }

        let exit = if bar.high >= pos.tp2_price {
            Some((pos.tp2_price, TradeKind::Win))
        } else if bar.low <= pos.stop_price {
            let kind = if pos.partial_taken {
                TradeKind::Breakeven
            } else {
                TradeKind::Loss
            };
            Some((pos.stop_price, kind))
        } else {
            None
        };

        if let Some((exit_price, kind)) = exit {
            let (gain, fee) = realize(pos.entry_price, exit_price, pos.remaining_size, fee_rate);
            self.equity += gain;
            self.trade_log.push(TradeLogEntry {
                time: bar.time,
                entry_time: pos.entry_time,
                kind,
                entry_price: pos.entry_price,
                exit_price,
                gain,
                fee,
                size: pos.remaining_size,
            });
            self.position = PositionState::Flat;
            self.cooldown_until = Some(bar.time + cooldown);
        }
    }
}

/// Net gain and fee for closing `size` units. A zero-size close is a no-op.
fn realize(entry_price: f64, exit_price: f64, size: f64, fee_rate: f64) -> (f64, f64) {
    if size == 0.0 {
        return (0.0, 0.0);
    }
    let fee = exit_price * size * fee_rate;
    ((exit_price - entry_price) * size - fee, fee)
}

/// Result of a complete backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trades: Vec<TradeLogEntry>,
    /// Starting equity, then one sample per bar after warm-up.
    pub equity_curve: Vec<f64>,
    pub metrics: Metrics,
    pub starting_equity: f64,
    pub bar_count: usize,
    pub warmup_bars: usize,
    /// BUY signals acted on.
    pub signal_count: usize,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .copied()
            .unwrap_or(self.starting_equity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::minutes(minute)
    }

    fn bar(minute: i64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            time: t(minute),
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    fn levels() -> ExitLevels {
        ExitLevels {
            tp1: 102.0,
            tp2: 104.0,
            stop: 99.0,
            trail_distance: Some(1.0),
        }
    }

    #[test]
    fn engine_config_defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.starting_equity, 1_000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn engine_config_rejects_bad_values() {
        let bad_equity = EngineConfig {
            starting_equity: 0.0,
            ..EngineConfig::default()
        };
        assert_eq!(bad_equity.validate(), Err(EngineConfigError::StartingEquity(0.0)));

        let bad_risk = EngineConfig {
            risk_per_trade: 1.5,
            ..EngineConfig::default()
        };
        assert_eq!(bad_risk.validate(), Err(EngineConfigError::RiskPerTrade(1.5)));

        let full_risk = EngineConfig {
            risk_per_trade: 1.0,
            ..EngineConfig::default()
        };
        assert!(full_risk.validate().is_ok());
    }

    #[test]
    fn open_sizes_by_risk() {
        let mut state = EngineState::new(1_000.0);
        state.open(&bar(0, 100.5, 99.5, 100.0), levels(), 0.01);
        let PositionState::Entered(pos) = &state.position else {
            panic!("expected open position");
        };
        // 1000 * 0.01 / (100 - 99)
        assert_eq!(pos.remaining_size, 10.0);
        assert_eq!(pos.high_water_mark, 100.0);
    }

    #[test]
    fn zero_risk_opens_zero_size() {
        let mut state = EngineState::new(1_000.0);
        let flat_levels = ExitLevels {
            stop: 100.0,
            ..levels()
        };
        state.open(&bar(0, 100.0, 100.0, 100.0), flat_levels, 0.01);
        let PositionState::Entered(pos) = &state.position else {
            panic!("expected open position");
        };
        assert_eq!(pos.remaining_size, 0.0);
    }

    #[test]
    fn stop_trails_high_water_mark() {
        let mut state = EngineState::new(1_000.0);
        state.open(&bar(0, 100.5, 99.5, 100.0), levels(), 0.01);
        state.manage(&bar(1, 101.5, 101.0, 101.2), 0.0, Duration::zero());
        let PositionState::Entered(pos) = &state.position else {
            panic!("expected open position");
        };
        assert_eq!(pos.high_water_mark, 101.5);
        assert_eq!(pos.stop_price, 100.5);
    }

    #[test]
    fn stop_never_loosens() {
        let mut state = EngineState::new(1_000.0);
        state.open(&bar(0, 100.5, 99.5, 100.0), levels(), 0.01);
        state.manage(&bar(1, 101.5, 101.0, 101.2), 0.0, Duration::zero());
        state.manage(&bar(2, 101.0, 100.8, 100.9), 0.0, Duration::zero());
        let PositionState::Entered(pos) = &state.position else {
            panic!("expected open position");
        };
        assert_eq!(pos.stop_price, 100.5);
    }

    #[test]
    fn partial_resets_stop_to_entry() {
        let mut state = EngineState::new(1_000.0);
        state.open(&bar(0, 100.5, 99.5, 100.0), levels(), 0.01);
        // Hits tp1 (102). The trail reaches 101.5 first, then the stop drops
        // to entry (100), so a low of 101.0 keeps the runner open.
        state.manage(&bar(1, 102.5, 101.0, 101.5), 0.0, Duration::minutes(5));

        assert_eq!(state.trade_log.len(), 1);
        assert_eq!(state.trade_log[0].kind, TradeKind::PartialWin);
        assert_eq!(state.trade_log[0].size, 5.0);
        let PositionState::Entered(pos) = &state.position else {
            panic!("expected open position");
        };
        assert_eq!(pos.stop_price, 100.0);
        assert_eq!(pos.high_water_mark, 102.5);
        assert!(state.cooldown_until.is_none());
    }

    #[test]
    fn partial_then_breakeven() {
        let mut state = EngineState::new(1_000.0);
        state.open(&bar(0, 100.5, 99.5, 100.0), levels(), 0.01);
        state.manage(&bar(1, 102.5, 101.0, 101.5), 0.0, Duration::minutes(5));
        // Trail re-raises the stop to 102.5 - 1, then low 101.0 stops out.
        state.manage(&bar(2, 102.0, 101.0, 101.2), 0.0, Duration::minutes(5));

        assert!(state.position.is_flat());
        assert_eq!(state.trade_log.len(), 2);
        assert_eq!(state.trade_log[1].kind, TradeKind::Breakeven);
        assert_eq!(state.trade_log[1].exit_price, 101.5);
        assert_eq!(state.trade_log[1].size, 5.0);
        assert_eq!(state.cooldown_until, Some(t(7)));
    }

    #[test]
    fn far_target_wins_ties_with_stop() {
        let mut state = EngineState::new(1_000.0);
        state.open(&bar(0, 100.5, 99.5, 100.0), levels(), 0.01);
        // Range touches tp1, tp2 and the initial stop.
        state.manage(&bar(1, 105.0, 98.0, 100.0), 0.0, Duration::zero());

        let kinds: Vec<TradeKind> = state.trade_log.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![TradeKind::PartialWin, TradeKind::Win]);
        assert_eq!(state.trade_log[1].exit_price, 104.0);
    }

    #[test]
    fn fees_reduce_gain() {
        let mut state = EngineState::new(1_000.0);
        state.open(&bar(0, 100.5, 99.5, 100.0), levels(), 0.01);
        state.manage(&bar(1, 99.5, 98.0, 98.5), 0.001, Duration::zero());

        let exit = &state.trade_log[0];
        assert_eq!(exit.kind, TradeKind::Loss);
        assert_eq!(exit.size, 10.0);
        assert_eq!(exit.exit_price, 99.0);
        assert!((exit.fee - 99.0 * 10.0 * 0.001).abs() < 1e-12);
        assert!((exit.gain - (-10.0 - exit.fee)).abs() < 1e-12);
        assert!((state.equity - (1_000.0 + exit.gain)).abs() < 1e-12);
    }

    #[test]
    fn zero_size_close_is_no_op() {
        assert_eq!(realize(100.0, 90.0, 0.0, 0.001), (0.0, 0.0));
    }

    #[test]
    fn cooldown_boundary_is_exclusive() {
        let mut state = EngineState::new(1_000.0);
        state.cooldown_until = Some(t(10));
        assert!(state.in_cooldown(t(9)));
        assert!(!state.in_cooldown(t(10)));
    }
}
