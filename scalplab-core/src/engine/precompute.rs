//! Indicator precomputation.
//!
//! All indicators are computed once before the bar loop begins; the loop only
//! reads them back by index.

use crate::domain::Bar;
use crate::indicators::{Indicator, IndicatorValues};

/// Compute every indicator over `bars` into one `IndicatorValues` container.
pub fn precompute_indicators(bars: &[Bar], indicators: &[Box<dyn Indicator>]) -> IndicatorValues {
    let mut values = IndicatorValues::new();
    for indicator in indicators {
        let series = indicator.compute(bars);
        debug_assert_eq!(
            series.len(),
            bars.len(),
            "indicator '{}' produced {} values for {} bars",
            indicator.name(),
            series.len(),
            bars.len()
        );
        values.insert(indicator.name(), series);
    }
    values
}

/// Maximum lookback across `indicators` (0 when empty).
pub fn compute_warmup(indicators: &[Box<dyn Indicator>]) -> usize {
    indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
}
