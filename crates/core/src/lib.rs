//! Minerva Core Domain
//!
//! Pure domain types for the Minerva backtesting kernel.
//! This crate contains no I/O, no logging, and is 100% unit testable.

pub mod entities;
pub mod market;

// Re-export commonly used types at crate root
pub use entities::{
    BarPrices, Commission, EvalOpen, Order, OrderBatch, OrderId, OrderState, Portfolio,
    PortfolioPosition, PriceEvaluator, Tax, XrdRecord,
};
pub use market::{CommonSnapshot, CommonWindow, Field, OhlcBlock, PriceSnapshot, PriceWindow};

/// Simulation timestamps. Feeds parse wall-clock-free local datetimes, so the
/// naive representation is used throughout the kernel.
pub type Timestamp = chrono::NaiveDateTime;
