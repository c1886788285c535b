//! Standalone runs: optimize a loaded dataset, or replay a saved best
//! configuration over a full dataset.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use scalplab_core::engine::{run_backtest, BacktestResult, EngineConfig, EngineConfigError};
use scalplab_core::strategy::{ScalpStrategy, StrategyConfigError};

use crate::config::{load_best_config, BestConfig, OptimizeConfig, PersistError};
use crate::data_loader::{load_data, LoadError, LoadedData};
use crate::optimizer::{OptimizationReport, OptimizeError, Optimizer};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("invalid engine settings: {0}")]
    Engine(#[from] EngineConfigError),
    #[error("invalid saved strategy: {0}")]
    Strategy(#[from] StrategyConfigError),
    #[error("optimization failed: {0}")]
    Optimize(#[from] OptimizeError),
}

/// A saved configuration replayed over a dataset.
#[derive(Debug, Clone)]
pub struct ValidationRun {
    pub best: BestConfig,
    pub result: BacktestResult,
    pub data_source: String,
    pub dataset_hash: String,
    pub synthetic: bool,
}

impl ValidationRun {
    /// True when the replay uses the same data the configuration was trained on.
    pub fn same_dataset(&self) -> bool {
        self.best.dataset_hash == self.dataset_hash
    }
}

/// Run the grid search over `data`, persisting the winner to `best_path`.
pub fn run_optimization(
    data: &LoadedData,
    config: &OptimizeConfig,
    best_path: Option<&Path>,
) -> Result<OptimizationReport, RunError> {
    let mut optimizer = Optimizer::from_config(config)
        .with_provenance(data.source.to_string(), data.dataset_hash.clone());
    if let Some(path) = best_path {
        optimizer = optimizer.with_best_config_path(path);
    }
    Ok(optimizer.run(&data.bars)?)
}

/// Replay `best` over every bar of `data`.
pub fn run_best_config(
    best: &BestConfig,
    data: &LoadedData,
    engine: &EngineConfig,
) -> Result<ValidationRun, RunError> {
    engine.validate()?;
    best.strategy.validate()?;

    let result = run_backtest(&data.bars, &ScalpStrategy::new(best.strategy), engine);
    let run = ValidationRun {
        best: best.clone(),
        result,
        data_source: data.source.to_string(),
        dataset_hash: data.dataset_hash.clone(),
        synthetic: data.is_synthetic(),
    };

    if run.same_dataset() {
        warn!("replaying over the training dataset; results include in-sample bars");
    }
    info!(
        data_source = %run.data_source,
        bars = run.result.bar_count,
        trades = run.result.metrics.trade_count,
        total_profit = run.result.metrics.total_profit,
        "validation run complete"
    );
    Ok(run)
}

/// The CSV a saved configuration was tuned on, if it is still on disk.
///
/// Synthetic sources cannot be rebuilt from the saved label alone and yield `None`.
pub fn tuned_data_path(best: &BestConfig) -> Option<PathBuf> {
    if best.data_source.starts_with("synthetic:") {
        return None;
    }
    let path = PathBuf::from(&best.data_source);
    if path.is_file() {
        Some(path)
    } else {
        warn!(data_source = %best.data_source, "tuned dataset no longer exists");
        None
    }
}

/// Load a saved configuration and a CSV dataset, then replay.
pub fn run_validation(
    best_path: &Path,
    data_path: &Path,
    engine: &EngineConfig,
) -> Result<ValidationRun, RunError> {
    let best = load_best_config(best_path)?;
    let data = load_data(data_path)?;
    run_best_config(&best, &data, engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::synthetic_data;
    use chrono::NaiveDate;
    use scalplab_core::strategy::StrategyConfig;

    fn data(label: &str, n: usize) -> LoadedData {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        synthetic_data(label, start, n)
    }

    fn best_for(data: &LoadedData) -> BestConfig {
        BestConfig::new(
            StrategyConfig {
                momentum_threshold: 15.0,
                near_tp_multiple: 1.5,
                far_tp_multiple: 4.0,
                trailing_multiple: 1.5,
                min_volatility: 0.01,
                cooldown_minutes: 10,
            },
            data.source.to_string(),
            data.dataset_hash.clone(),
            data.bars.len(),
        )
    }

    #[test]
    fn replay_covers_every_bar() {
        let d = data("replay", 600);
        let run = run_best_config(&best_for(&d), &d, &EngineConfig::default()).unwrap();
        assert_eq!(run.result.bar_count, 600);
        assert_eq!(run.result.equity_curve.len(), 1 + 400);
        assert!(run.synthetic);
        assert!(run.same_dataset());
    }

    #[test]
    fn replay_rejects_invalid_saved_strategy() {
        let d = data("replay", 300);
        let mut best = best_for(&d);
        best.strategy.near_tp_multiple = 9.0;
        let err = run_best_config(&best, &d, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, RunError::Strategy(_)));
    }

    #[test]
    fn validation_requires_saved_config() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("data.csv");
        std::fs::write(&csv, "time,price\n2024-01-02,1\n").unwrap();
        let err = run_validation(&dir.path().join("best.json"), &csv, &EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, RunError::Persist(PersistError::NotFound(_))));
    }

    #[test]
    fn tuned_data_path_follows_saved_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("BTCUSDT_1m.csv");
        std::fs::write(&csv, "time,price\n2024-01-02,1\n2024-01-03,2\n").unwrap();
        let loaded = load_data(&csv).unwrap();

        let best = best_for(&loaded);
        assert_eq!(tuned_data_path(&best), Some(csv.clone()));

        std::fs::remove_file(&csv).unwrap();
        assert_eq!(tuned_data_path(&best), None);
    }

    #[test]
    fn tuned_data_path_skips_synthetic() {
        let d = data("replay", 10);
        assert_eq!(tuned_data_path(&best_for(&d)), None);
    }

    #[test]
    fn optimization_persists_and_validation_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let best_path = dir.path().join("best.json");
        let d = data("optimize", 1_200);
        let config = OptimizeConfig::default();

        let report = run_optimization(&d, &config, Some(&best_path)).unwrap();
        let saved = load_best_config(&best_path).unwrap();
        assert_eq!(Some(&saved), report.best_config.as_ref());
        assert_eq!(saved.dataset_hash, d.dataset_hash);
        assert_eq!(saved.train_bars, 960);

        let run = run_best_config(&saved, &d, &config.engine).unwrap();
        assert_eq!(run.best.strategy, report.best.unwrap().config);
    }
}
