//! Trade engine: per-run state and the bar-by-bar loop.

pub mod loop_runner;
pub mod precompute;
pub mod state;

pub use loop_runner::run_backtest;
pub use precompute::{compute_warmup, precompute_indicators};
pub use state::{
    BacktestResult, EngineConfig, EngineConfigError, EngineState, OpenPosition, PositionState,
};
