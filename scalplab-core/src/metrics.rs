//! Performance metrics: pure functions over a trade log and an equity curve.

use crate::domain::TradeLogEntry;
use serde::{Deserialize, Serialize};

/// Added to the standard deviation so a flat curve never divides by zero.
const RATIO_EPSILON: f64 = 1e-9;

/// Aggregate metrics for one backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Logical trades: distinct entry prices in the log.
    pub trade_count: usize,
    /// Percentage (0–100) of logical trades with positive summed gain.
    pub win_rate: f64,
    /// Final equity minus starting equity.
    pub total_profit: f64,
    /// Mean of successive equity differences over their population standard deviation.
    pub risk_adjusted_ratio: f64,
}

impl Metrics {
    /// Compute all metrics. With no trades every field is zero.
    pub fn compute(trades: &[TradeLogEntry], equity_curve: &[f64], starting_equity: f64) -> Self {
        let grouped = group_by_entry(trades);
        if grouped.is_empty() {
            return Self::default();
        }
        let wins = grouped.iter().filter(|&&(_, gain)| gain > 0.0).count();
        let final_equity = equity_curve.last().copied().unwrap_or(starting_equity);
        Self {
            trade_count: grouped.len(),
            win_rate: wins as f64 / grouped.len() as f64 * 100.0,
            total_profit: final_equity - starting_equity,
            risk_adjusted_ratio: risk_adjusted_ratio(equity_curve),
        }
    }
}

/// Sum gains per entry price, in first-seen order.
///
/// A partial exit and its final exit share an entry price, so they collapse
/// into one logical trade.
pub fn group_by_entry(trades: &[TradeLogEntry]) -> Vec<(f64, f64)> {
    let mut groups: Vec<(f64, f64)> = Vec::new();
    for entry in trades {
        let key = entry.entry_price.to_bits();
        match groups.iter_mut().find(|(price, _)| price.to_bits() == key) {
            Some((_, gain)) => *gain += entry.gain,
            None => groups.push((entry.entry_price, entry.gain)),
        }
    }
    groups
}

/// mean(diffs) / (std(diffs) + 1e-9) over successive equity differences.
pub fn risk_adjusted_ratio(equity_curve: &[f64]) -> f64 {
    let diffs: Vec<f64> = equity_curve.windows(2).map(|w| w[1] - w[0]).collect();
    if diffs.is_empty() {
        return 0.0;
    }
    mean_f64(&diffs) / (population_std(&diffs) + RATIO_EPSILON)
}

pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Row-level tally of a trade log, counting partial exits individually.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TradeLogSummary {
    pub entries: usize,
    pub wins: usize,
    /// Rows with zero or negative gain.
    pub losses: usize,
    /// Percentage (0–100) of rows with positive gain.
    pub win_rate: f64,
    pub total_gain: f64,
    pub total_fees: f64,
}

impl TradeLogSummary {
    pub fn from_log(trades: &[TradeLogEntry]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }
        let wins = trades.iter().filter(|e| e.gain > 0.0).count();
        let losses = trades.iter().filter(|e| e.gain <= 0.0).count();
        Self {
            entries: trades.len(),
            wins,
            losses,
            win_rate: wins as f64 / trades.len() as f64 * 100.0,
            total_gain: trades.iter().map(|e| e.gain).sum(),
            total_fees: trades.iter().map(|e| e.fee).sum(),
        }
    }
}
