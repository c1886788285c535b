//! Tunable parameters of the scalp strategy.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyConfigError {
    #[error("{field} must be > 0, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("near take-profit multiple ({near}) must be below the far multiple ({far})")]
    TargetsInverted { near: f64, far: f64 },
}

/// Parameters swept by the optimizer.
///
/// Multiples are expressed in units of the entry-time volatility reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// RSI level the momentum oscillator must cross upward.
    pub momentum_threshold: f64,
    pub near_tp_multiple: f64,
    pub far_tp_multiple: f64,
    /// Initial stop distance and trailing distance.
    pub trailing_multiple: f64,
    /// ATR must exceed this for an entry.
    pub min_volatility: f64,
    pub cooldown_minutes: i64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            momentum_threshold: 15.0,
            near_tp_multiple: 2.0,
            far_tp_multiple: 4.0,
            trailing_multiple: 1.5,
            min_volatility: 0.1,
            cooldown_minutes: 0,
        }
    }
}

impl StrategyConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.cooldown_minutes)
    }

    pub fn validate(&self) -> Result<(), StrategyConfigError> {
        for (field, value) in [
            ("near_tp_multiple", self.near_tp_multiple),
            ("far_tp_multiple", self.far_tp_multiple),
            ("trailing_multiple", self.trailing_multiple),
        ] {
            if !(value > 0.0) {
                return Err(StrategyConfigError::NotPositive { field, value });
            }
        }
        for (field, value) in [
            ("momentum_threshold", self.momentum_threshold),
            ("min_volatility", self.min_volatility),
            ("cooldown_minutes", self.cooldown_minutes as f64),
        ] {
            if !(value >= 0.0) {
                return Err(StrategyConfigError::Negative { field, value });
            }
        }
        if self.near_tp_multiple >= self.far_tp_multiple {
            return Err(StrategyConfigError::TargetsInverted {
                near: self.near_tp_multiple,
                far: self.far_tp_multiple,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_targets_rejected() {
        let config = StrategyConfig {
            near_tp_multiple: 4.0,
            far_tp_multiple: 4.0,
            ..StrategyConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(StrategyConfigError::TargetsInverted { near: 4.0, far: 4.0 })
        );
    }

    #[test]
    fn zero_trailing_rejected() {
        let config = StrategyConfig {
            trailing_multiple: 0.0,
            ..StrategyConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StrategyConfigError::NotPositive { field: "trailing_multiple", .. })
        ));
    }

    #[test]
    fn zero_thresholds_allowed() {
        let config = StrategyConfig {
            momentum_threshold: 0.0,
            min_volatility: 0.0,
            ..StrategyConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cooldown_in_minutes() {
        let config = StrategyConfig {
            cooldown_minutes: 20,
            ..StrategyConfig::default()
        };
        assert_eq!(config.cooldown(), Duration::minutes(20));
    }

    #[test]
    fn json_roundtrip_is_exact() {
        let config = StrategyConfig {
            momentum_threshold: 10.0,
            near_tp_multiple: 1.5,
            far_tp_multiple: 6.0,
            trailing_multiple: 2.0,
            min_volatility: 0.2,
            cooldown_minutes: 10,
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: StrategyConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
