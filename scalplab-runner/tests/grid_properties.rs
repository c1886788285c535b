//! Property tests for grid enumeration and the train/test split.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use scalplab_core::domain::Bar;
use scalplab_runner::optimizer::{split_train_test, ParamGrid};

fn arb_list() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((1u32..20).prop_map(|v| v as f64 * 0.5), 1..4)
}

proptest! {
    #[test]
    fn every_config_has_near_below_far(near in arb_list(), far in arb_list()) {
        let grid = ParamGrid {
            near_tp_multiple: near.clone(),
            far_tp_multiple: far.clone(),
            ..ParamGrid::default()
        };
        let configs = grid.generate_configs();
        prop_assert!(configs.iter().all(|c| c.near_tp_multiple < c.far_tp_multiple));

        let valid_pairs = far
            .iter()
            .map(|f| near.iter().filter(|&&n| n < *f).count())
            .sum::<usize>();
        prop_assert_eq!(configs.len(), valid_pairs * 16);
    }

    #[test]
    fn split_partitions_in_order(n in 0usize..2_000) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let bars: Vec<Bar> = (0..n)
            .map(|i| Bar {
                time: start + Duration::minutes(i as i64),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 0.0,
            })
            .collect();
        let (train, test) = split_train_test(&bars);
        prop_assert_eq!(train.len(), (n as f64 * 0.8).floor() as usize);
        prop_assert_eq!(train.len() + test.len(), n);
        if let (Some(a), Some(b)) = (train.last(), test.first()) {
            prop_assert!(a.time < b.time);
        }
    }
}
