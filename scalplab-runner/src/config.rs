//! Run configuration (TOML) and best-config persistence (JSON).

use chrono::{NaiveDateTime, Utc};
use scalplab_core::engine::{EngineConfig, EngineConfigError};
use scalplab_core::strategy::StrategyConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::optimizer::ParamGrid;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid engine settings: {0}")]
    Engine(#[from] EngineConfigError),

    #[error("grid list '{0}' is empty")]
    EmptyGridList(&'static str),
}

/// Sweep execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Evaluate grid points on the rayon pool.
    pub parallel: bool,
    /// Wall-clock limit; grid points not started before it are skipped.
    pub time_budget_secs: Option<u64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            time_budget_secs: None,
        }
    }
}

/// Everything an optimizer run needs besides the data.
///
/// ```toml
/// [engine]
/// starting_equity = 1000.0
/// fee_rate = 0.001
/// risk_per_trade = 0.01
///
/// [grid]
/// momentum_threshold = [10.0, 15.0]
///
/// [sweep]
/// parallel = true
/// time_budget_secs = 600
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    pub engine: EngineConfig,
    pub grid: ParamGrid,
    pub sweep: SweepConfig,
}

impl OptimizeConfig {
    pub fn from_toml_str(s: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load `path` if given and present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) if p.exists() => Self::load(p),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if let Some(name) = self.grid.first_empty_list() {
            return Err(ConfigError::EmptyGridList(name));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(
        "no saved configuration at '{}'; run `scalplab optimize` first",
        .0.display()
    )]
    NotFound(PathBuf),

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The winning parameters of an optimizer run, plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestConfig {
    pub strategy: StrategyConfig,
    /// Path or synthetic label of the training data.
    pub data_source: String,
    pub dataset_hash: String,
    pub train_bars: usize,
    pub trained_at: NaiveDateTime,
}

impl BestConfig {
    pub fn new(
        strategy: StrategyConfig,
        data_source: impl Into<String>,
        dataset_hash: impl Into<String>,
        train_bars: usize,
    ) -> Self {
        Self {
            strategy,
            data_source: data_source.into(),
            dataset_hash: dataset_hash.into(),
            train_bars,
            trained_at: Utc::now().naive_utc(),
        }
    }
}

/// Write `best` as pretty JSON, replacing any previous file.
pub fn save_best_config(path: &Path, best: &BestConfig) -> Result<(), PersistError> {
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let json = serde_json::to_string_pretty(best).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_err)?;
    info!(path = %path.display(), "saved best configuration");
    Ok(())
}

pub fn load_best_config(path: &Path) -> Result<BestConfig, PersistError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            PersistError::NotFound(path.to_path_buf())
        } else {
            PersistError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    serde_json::from_str(&content).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })
}
