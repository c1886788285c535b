//! Trade log entries — one row per realised exit (partial or final).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// How an exit was realised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    /// Half of the position closed at the near take-profit.
    PartialWin,
    /// Remainder closed at the far take-profit.
    Win,
    /// Stopped out before the near take-profit was reached.
    Loss,
    /// Stopped out after the near take-profit (stop at entry or better).
    Breakeven,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::PartialWin => "partial_win",
            TradeKind::Win => "win",
            TradeKind::Loss => "loss",
            TradeKind::Breakeven => "breakeven",
        }
    }

    /// True for exits that close the whole remaining position.
    pub fn is_final(&self) -> bool {
        !matches!(self, TradeKind::PartialWin)
    }
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TradeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "partial_win" => Ok(TradeKind::PartialWin),
            "win" => Ok(TradeKind::Win),
            "loss" => Ok(TradeKind::Loss),
            "breakeven" => Ok(TradeKind::Breakeven),
            other => Err(format!("unknown trade kind '{other}'")),
        }
    }
}

/// A realised exit. A logical trade emits one or two entries sharing `entry_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    /// Time of the bar on which the exit happened.
    pub time: NaiveDateTime,
    /// Time of the bar on which the position was opened.
    pub entry_time: NaiveDateTime,
    pub kind: TradeKind,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Realised gain net of `fee`.
    pub gain: f64,
    pub fee: f64,
    /// Units closed by this exit.
    pub size: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_string_roundtrip() {
        for kind in [
            TradeKind::PartialWin,
            TradeKind::Win,
            TradeKind::Loss,
            TradeKind::Breakeven,
        ] {
            assert_eq!(kind.as_str().parse::<TradeKind>().unwrap(), kind);
        }
        assert!("stop".parse::<TradeKind>().is_err());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&TradeKind::PartialWin).unwrap();
        assert_eq!(json, "\"partial_win\"");
    }

    #[test]
    fn only_partial_is_not_final() {
        assert!(!TradeKind::PartialWin.is_final());
        assert!(TradeKind::Win.is_final());
        assert!(TradeKind::Loss.is_final());
        assert!(TradeKind::Breakeven.is_final());
    }
}
