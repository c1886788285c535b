//! Relative Strength Index (RSI) over closing prices.
//!
//! Gains and losses are exponentially smoothed with alpha = 1/period, seeded
//! at zero on bar 0 (which has no change). A missing change counts as no move.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), and 100 whenever avg_loss is 0.
//! First defined value at index `period - 1`.

use super::values::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut out = vec![f64::NAN; n];
        let alpha = 1.0 / self.period as f64;
        let mut avg_gain = 0.0;
        let mut avg_loss = 0.0;

        for i in 1..n {
            let change = bars[i].close - bars[i - 1].close;
            // NaN compares false on both sides.
            let gain = if change > 0.0 { change } else { 0.0 };
            let loss = if change < 0.0 { -change } else { 0.0 };
            avg_gain += alpha * (gain - avg_gain);
            avg_loss += alpha * (loss - avg_loss);
            if i >= self.lookback() {
                out[i] = rsi_from_averages(avg_gain, avg_loss);
            }
        }
        if n > 0 && self.lookback() == 0 {
            out[0] = rsi_from_averages(0.0, 0.0);
        }

        out
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
