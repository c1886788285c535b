//! Grid-search optimizer with a chronological train/test split.
//!
//! Every grid point is simulated on the training segment, the most profitable
//! one is persisted, and that single winner is then run once on the unseen
//! test segment. The test run never influences which configuration wins.

use rayon::prelude::*;
use scalplab_core::domain::Bar;
use scalplab_core::engine::{run_backtest, BacktestResult, EngineConfig, EngineConfigError};
use scalplab_core::metrics::Metrics;
use scalplab_core::strategy::{ScalpStrategy, Strategy, StrategyConfig};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{save_best_config, BestConfig, OptimizeConfig, PersistError};

/// Share of bars used for training; the rest is held out for validation.
pub const TRAIN_NUMERATOR: usize = 4;
pub const TRAIN_DENOMINATOR: usize = 5;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("training segment has {train_bars} bars but the warm-up needs more than {warmup_bars}")]
    InsufficientData {
        train_bars: usize,
        warmup_bars: usize,
    },

    #[error("invalid engine settings: {0}")]
    Engine(#[from] EngineConfigError),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Split bars chronologically at ⌊len × 0.8⌋: training first, test after.
pub fn split_train_test(bars: &[Bar]) -> (&[Bar], &[Bar]) {
    let split = bars.len() * TRAIN_NUMERATOR / TRAIN_DENOMINATOR;
    bars.split_at(split)
}

/// Candidate values for each strategy parameter.
///
/// Field order is enumeration order: the last field varies fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub momentum_threshold: Vec<f64>,
    pub far_tp_multiple: Vec<f64>,
    pub trailing_multiple: Vec<f64>,
    pub cooldown_minutes: Vec<i64>,
    pub min_volatility: Vec<f64>,
    pub near_tp_multiple: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            momentum_threshold: vec![10.0, 15.0],
            far_tp_multiple: vec![4.0, 6.0],
            trailing_multiple: vec![1.5, 2.0],
            cooldown_minutes: vec![10, 20],
            min_volatility: vec![0.1, 0.2],
            near_tp_multiple: vec![1.5, 2.0],
        }
    }
}

impl ParamGrid {
    /// Every valid combination, in enumeration order. Combinations with the
    /// near target at or beyond the far target are skipped.
    pub fn generate_configs(&self) -> Vec<StrategyConfig> {
        let mut configs = Vec::new();
        for &momentum_threshold in &self.momentum_threshold {
            for &far_tp_multiple in &self.far_tp_multiple {
                for &trailing_multiple in &self.trailing_multiple {
                    for &cooldown_minutes in &self.cooldown_minutes {
                        for &min_volatility in &self.min_volatility {
                            for &near_tp_multiple in &self.near_tp_multiple {
                                if near_tp_multiple >= far_tp_multiple {
                                    continue;
                                }
                                configs.push(StrategyConfig {
                                    momentum_threshold,
                                    near_tp_multiple,
                                    far_tp_multiple,
                                    trailing_multiple,
                                    min_volatility,
                                    cooldown_minutes,
                                });
                            }
                        }
                    }
                }
            }
        }
        configs
    }

    /// Number of valid combinations.
    pub fn size(&self) -> usize {
        self.generate_configs().len()
    }

    /// Name of the first parameter list that is empty, if any.
    pub fn first_empty_list(&self) -> Option<&'static str> {
        [
            ("momentum_threshold", self.momentum_threshold.is_empty()),
            ("far_tp_multiple", self.far_tp_multiple.is_empty()),
            ("trailing_multiple", self.trailing_multiple.is_empty()),
            ("cooldown_minutes", self.cooldown_minutes.is_empty()),
            ("min_volatility", self.min_volatility.is_empty()),
            ("near_tp_multiple", self.near_tp_multiple.is_empty()),
        ]
        .into_iter()
        .find_map(|(name, empty)| empty.then_some(name))
    }
}

/// One evaluated grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Position in enumeration order.
    pub index: usize,
    pub config: StrategyConfig,
    pub metrics: Metrics,
}

/// Outcome of an optimizer run.
#[derive(Debug, Clone, Default)]
pub struct OptimizationReport {
    /// Evaluated grid points, in enumeration order.
    pub evaluations: Vec<Evaluation>,
    pub best: Option<Evaluation>,
    pub best_config: Option<BestConfig>,
    /// The winner run once on the test segment.
    pub validation: Option<BacktestResult>,
    pub grid_size: usize,
    /// Grid points not started before the time budget ran out.
    pub skipped: usize,
    pub train_bars: usize,
    pub test_bars: usize,
    pub elapsed: Duration,
}

impl OptimizationReport {
    /// Top `n` evaluations by training profit. Ties keep enumeration order.
    pub fn top_n(&self, n: usize) -> Vec<&Evaluation> {
        let mut sorted: Vec<&Evaluation> = self.evaluations.iter().collect();
        sorted.sort_by(|a, b| {
            b.metrics
                .total_profit
                .partial_cmp(&a.metrics.total_profit)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted.truncate(n);
        sorted
    }
}

/// The evaluation with the highest total profit. The first one enumerated
/// wins ties.
pub fn select_best(evaluations: &[Evaluation]) -> Option<&Evaluation> {
    let mut best: Option<&Evaluation> = None;
    for eval in evaluations {
        match best {
            Some(b) if !(eval.metrics.total_profit > b.metrics.total_profit) => {}
            _ => best = Some(eval),
        }
    }
    best
}

/// Grid-search driver.
#[derive(Debug, Clone)]
pub struct Optimizer {
    grid: ParamGrid,
    engine: EngineConfig,
    parallel: bool,
    time_budget: Option<Duration>,
    best_config_path: Option<PathBuf>,
    data_source: String,
    dataset_hash: String,
}

impl Optimizer {
    pub fn new(grid: ParamGrid, engine: EngineConfig) -> Self {
        Self {
            grid,
            engine,
            parallel: true,
            time_budget: None,
            best_config_path: None,
            data_source: String::new(),
            dataset_hash: String::new(),
        }
    }

    pub fn from_config(config: &OptimizeConfig) -> Self {
        Self::new(config.grid.clone(), config.engine.clone())
            .with_parallelism(config.sweep.parallel)
            .with_time_budget(config.sweep.time_budget_secs.map(Duration::from_secs))
    }

    /// Enables or disables parallel evaluation.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_time_budget(mut self, budget: Option<Duration>) -> Self {
        self.time_budget = budget;
        self
    }

    /// Persist the winner here before validating it.
    pub fn with_best_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.best_config_path = Some(path.into());
        self
    }

    /// Provenance recorded in the persisted best configuration.
    pub fn with_provenance(
        mut self,
        data_source: impl Into<String>,
        dataset_hash: impl Into<String>,
    ) -> Self {
        self.data_source = data_source.into();
        self.dataset_hash = dataset_hash.into();
        self
    }

    pub fn grid(&self) -> &ParamGrid {
        &self.grid
    }

    /// Split, sweep the grid on the training segment, persist the winner, and
    /// validate it once on the test segment.
    pub fn run(&self, bars: &[Bar]) -> Result<OptimizationReport, OptimizeError> {
        let started = Instant::now();
        self.engine.validate()?;

        let (train, test) = split_train_test(bars);
        let configs = self.grid.generate_configs();
        let mut report = OptimizationReport {
            grid_size: configs.len(),
            train_bars: train.len(),
            test_bars: test.len(),
            ..OptimizationReport::default()
        };

        if configs.is_empty() {
            warn!("parameter grid has no valid combinations; nothing to optimize");
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        let warmup_bars = self
            .engine
            .warmup_bars
            .max(ScalpStrategy::new(StrategyConfig::default()).warmup_bars());
        if train.len() <= warmup_bars {
            return Err(OptimizeError::InsufficientData {
                train_bars: train.len(),
                warmup_bars,
            });
        }
        if test.len() <= warmup_bars {
            warn!(
                test_bars = test.len(),
                warmup_bars, "test segment is within the warm-up; validation cannot trade"
            );
        }

        info!(
            grid_size = configs.len(),
            train_bars = train.len(),
            test_bars = test.len(),
            parallel = self.parallel,
            "starting grid search"
        );

        let deadline = self.time_budget.map(|budget| started + budget);
        let skipped = AtomicUsize::new(0);
        let evaluate = |(index, config): (usize, &StrategyConfig)| -> Option<Evaluation> {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                skipped.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            let result = run_backtest(train, &ScalpStrategy::new(*config), &self.engine);
            debug!(
                index,
                ?config,
                total_profit = result.metrics.total_profit,
                trades = result.metrics.trade_count,
                "evaluated grid point"
            );
            Some(Evaluation {
                index,
                config: *config,
                metrics: result.metrics,
            })
        };

        let outcomes: Vec<Option<Evaluation>> = if self.parallel {
            configs.par_iter().enumerate().map(evaluate).collect()
        } else {
            configs.iter().enumerate().map(evaluate).collect()
        };
        report.evaluations = outcomes.into_iter().flatten().collect();
        report.skipped = skipped.into_inner();
        if report.skipped > 0 {
            warn!(
                skipped = report.skipped,
                evaluated = report.evaluations.len(),
                "time budget exhausted; remaining grid points skipped"
            );
        }

        let Some(best) = select_best(&report.evaluations).cloned() else {
            warn!("no grid point was evaluated");
            report.elapsed = started.elapsed();
            return Ok(report);
        };
        info!(
            index = best.index,
            config = ?best.config,
            total_profit = best.metrics.total_profit,
            "best training configuration"
        );

        let best_config = BestConfig::new(
            best.config,
            self.data_source.clone(),
            self.dataset_hash.clone(),
            train.len(),
        );
        if let Some(path) = &self.best_config_path {
            save_best_config(path, &best_config)?;
        }

        let validation = run_backtest(test, &ScalpStrategy::new(best.config), &self.engine);
        info!(
            total_profit = validation.metrics.total_profit,
            trades = validation.metrics.trade_count,
            win_rate = validation.metrics.win_rate,
            "validation on test segment"
        );

        report.best = Some(best);
        report.best_config = Some(best_config);
        report.validation = Some(validation);
        report.elapsed = started.elapsed();
        Ok(report)
    }
}
