//! ScalpLab Runner — data loading, grid-search optimization, persistence, export.
//!
//! This crate builds on `scalplab-core` to provide:
//! - CSV bar loading (OHLCV or price-only) and synthetic data
//! - TOML run configuration and JSON best-config persistence
//! - Grid search over strategy parameters with an 80/20 train/test split
//! - Replay of a saved configuration over a full dataset
//! - CSV, JSON and Markdown export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod optimizer;
pub mod runner;

pub use config::{
    load_best_config, save_best_config, BestConfig, ConfigError, OptimizeConfig, PersistError,
    SweepConfig,
};
pub use data_loader::{
    dataset_hash, generate_synthetic_bars, list_data_files, load_bars_csv, load_data,
    synthetic_data, DataSource, LoadError, LoadedData,
};
pub use optimizer::{
    select_best, split_train_test, Evaluation, OptimizationReport, OptimizeError, Optimizer,
    ParamGrid,
};
pub use runner::{
    run_best_config, run_optimization, run_validation, tuned_data_path, RunError, ValidationRun,
};
