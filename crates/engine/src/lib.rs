//! Minerva Engine
//!
//! The orchestrator of the Minerva backtesting kernel. Wires feeds,
//! synchronizers, ledgers and a strategy into a per-tick simulation loop:
//! advance the clock, retry pending orders, ask the strategy for new ones,
//! route them, run corporate actions, revalue.

pub mod engine;
pub mod strategy;

pub use engine::{Engine, EngineError, RunSummary};
pub use strategy::{Strategy, TickContext};
