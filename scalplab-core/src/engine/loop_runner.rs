//! Bar-by-bar simulation loop.
//!
//! Per bar after warm-up:
//! 1. Cooldown: record equity and move on
//! 2. Flat: act on a BUY signal by entering at the close
//! 3. Entered: trail the stop, take the partial, check the final exit
//! 4. Record equity

use crate::domain::Bar;
use crate::metrics::Metrics;
use crate::strategy::{Signal, Strategy};

use super::state::{BacktestResult, EngineConfig, EngineState, PositionState};

/// Run one strategy over `bars` and return the trade log, equity curve and metrics.
///
/// The loop is sequential and pure: the same inputs always produce the same
/// result. Fewer bars than the warm-up produce no trades and an equity curve of
/// just the starting equity.
pub fn run_backtest(bars: &[Bar], strategy: &dyn Strategy, config: &EngineConfig) -> BacktestResult {
    let prepared = strategy.prepare(bars);
    let warmup_bars = config.warmup_bars.max(strategy.warmup_bars()).max(1);
    let cooldown = strategy.cooldown();

    let mut state = EngineState::new(config.starting_equity);
    state
        .equity_curve
        .reserve(prepared.len().saturating_sub(warmup_bars));
    let mut signal_count = 0;

    for i in warmup_bars..prepared.len() {
        let current = prepared.row(i);
        let bar = current.bar;

        if state.in_cooldown(bar.time) {
            state.record_equity();
            continue;
        }

        match state.position {
            PositionState::Flat => {
                let previous = prepared.row(i - 1);
                if strategy.signal(&current, &previous) == Signal::Buy {
                    signal_count += 1;
                    let levels = strategy.exit_levels(&current, bar.close);
                    state.open(bar, levels, config.risk_per_trade);
                }
            }
            PositionState::Entered(_) => state.manage(bar, config.fee_rate, cooldown),
        }

        state.record_equity();
    }

    let metrics = Metrics::compute(&state.trade_log, &state.equity_curve, config.starting_equity);

    BacktestResult {
        trades: state.trade_log,
        equity_curve: state.equity_curve,
        metrics,
        starting_equity: config.starting_equity,
        bar_count: bars.len(),
        warmup_bars,
        signal_count,
    }
}
