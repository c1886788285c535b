//! ScalpLab Core: domain types, indicators, the scalp strategy, the trade
//! engine and performance metrics.
//!
//! Everything here is pure. Loading, persistence and the optimizer live in
//! `scalplab-runner`.

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod metrics;
pub mod strategy;

pub use domain::{Bar, TradeKind, TradeLogEntry};
pub use engine::{run_backtest, BacktestResult, EngineConfig, EngineConfigError};
pub use metrics::{Metrics, TradeLogSummary};
pub use strategy::{ScalpStrategy, Signal, Strategy, StrategyConfig, StrategyConfigError};
