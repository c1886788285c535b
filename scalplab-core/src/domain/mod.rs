//! Domain types for ScalpLab

pub mod bar;
pub mod trade;

pub use bar::Bar;
pub use trade::{TradeKind, TradeLogEntry};
