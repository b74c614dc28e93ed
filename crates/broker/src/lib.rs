//! Minerva Broker
//!
//! The matching side of the Minerva backtesting kernel: per-ledger order
//! processing against bar data, portfolio accounting, ex-rights/ex-dividend
//! handling, and the aggregator that routes strategy output across ledgers
//! and tracks wealth over time.

pub mod aggregator;
pub mod ledger;
pub mod xrd;

pub use aggregator::LedgerAggregator;
pub use ledger::{Ledger, RejectStats};
pub use xrd::{XrdLayout, XrdProcessor};
