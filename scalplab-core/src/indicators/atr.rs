//! Average True Range (ATR) — the volatility range measure.
//!
//! TR[0] = high - low; TR[t] = max(high-low, |high-prev_close|, |low-prev_close|),
//! ignoring missing terms. ATR seeds with the mean of TR[0..period] at index
//! `period - 1` and then Wilder-smooths.

use super::values::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// True range series. Bar 0 has no previous close and uses its own range.
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let mut tr = Vec::with_capacity(bars.len());
    if let Some(first) = bars.first() {
        tr.push(first.high - first.low);
    }
    for pair in bars.windows(2) {
        let prev_close = pair[0].close;
        let bar = &pair[1];
        // f64::max drops a NaN operand.
        tr.push(
            (bar.high - bar.low)
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs()),
        );
    }
    tr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut out = vec![f64::NAN; n];
        if n < self.period {
            return out;
        }

        let tr = true_range(bars);
        let period = self.period as f64;

        let seed_window = &tr[..self.period];
        if seed_window.iter().any(|v| v.is_nan()) {
            return out;
        }
        let mut atr = seed_window.iter().sum::<f64>() / period;
        out[self.period - 1] = atr;

        for i in self.period..n {
            if tr[i].is_nan() {
                // Poisoned: leave the remainder undefined.
                break;
            }
            atr = (atr * (period - 1.0) + tr[i]) / period;
            out[i] = atr;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};
    use chrono::NaiveDate;

    fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Bar {
                time: base + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn true_range_basic() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // 10
            (102.0, 108.0, 100.0, 106.0), // max(8, 6, 2) = 8
            (106.0, 107.0, 98.0, 99.0),   // max(9, 1, 8) = 9
        ]);
        let tr = true_range(&bars);
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bars = make_ohlc_bars(&[
            (98.0, 102.0, 97.0, 100.0),
            (110.0, 115.0, 108.0, 112.0), // max(7, 15, 8) = 15
        ]);
        assert_approx(true_range(&bars)[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_skips_missing_high() {
        let mut bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
        ]);
        bars[1].high = f64::NAN;
        // Only |low - prev_close| survives.
        assert_approx(true_range(&bars)[1], 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_period_3() {
        let bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let result = Atr::new(3).compute(&bars);

        assert!(result[..2].iter().all(|v| v.is_nan()));
        assert_approx(result[2], 9.0, DEFAULT_EPSILON);
        // (9 * 2 + 6) / 3 = 8, then (8 * 2 + 6) / 3 = 22/3
        assert_approx(result[3], 8.0, DEFAULT_EPSILON);
        assert_approx(result[4], 22.0 / 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn atr_zero_for_constant_bars() {
        let bars = make_ohlc_bars(&[(50.0, 50.0, 50.0, 50.0); 6]);
        let result = Atr::new(3).compute(&bars);
        assert_eq!(result[2], 0.0);
        assert_eq!(result[5], 0.0);
    }

    #[test]
    fn atr_nan_in_seed_is_undefined() {
        let mut bars = make_ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
        ]);
        bars[1].high = f64::NAN;
        bars[1].low = f64::NAN;
        let result = Atr::new(2).compute(&bars);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn atr_too_few_bars() {
        let bars = make_ohlc_bars(&[(50.0, 51.0, 49.0, 50.0); 2]);
        assert!(Atr::new(3).compute(&bars).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::new(14).lookback(), 13);
    }
}
