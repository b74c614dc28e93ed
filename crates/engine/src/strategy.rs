use minerva_broker::LedgerAggregator;
use minerva_core::{CommonWindow, OrderBatch, PriceWindow, Timestamp};
use minerva_feeds::sync::{CommonFeedSynchronizer, PriceFeedSynchronizer};

/// Read-only view of the simulation handed to the strategy each tick.
pub struct TickContext<'a> {
    pub time: Timestamp,
    /// Zero-based index of this in-range tick.
    pub tick: usize,
    pub(crate) prices: &'a PriceFeedSynchronizer,
    pub(crate) commons: &'a CommonFeedSynchronizer,
    pub(crate) broker: &'a LedgerAggregator,
}

impl<'a> TickContext<'a> {
    /// Price history of the feed bound to `ledger`.
    pub fn window(&self, ledger: usize) -> &'a PriceWindow {
        self.prices.window(ledger)
    }

    /// Whether `ledger`'s feed carried fresh data this tick.
    pub fn tick_valid(&self, ledger: usize) -> bool {
        self.prices.tick_valid(ledger)
    }

    pub fn ledger_count(&self) -> usize {
        self.prices.len()
    }

    pub fn common_window(&self, feed: usize) -> &'a CommonWindow {
        self.commons.window(feed)
    }

    pub fn common_count(&self) -> usize {
        self.commons.len()
    }

    pub fn codes(&self, ledger: usize) -> &'a [String] {
        self.prices.feed(ledger).codes()
    }

    pub fn cash(&self, ledger: usize) -> f64 {
        self.broker.cash(ledger)
    }

    pub fn position(&self, ledger: usize, asset: usize) -> i64 {
        self.broker.ledger(ledger).position(asset)
    }

    pub fn positions(&self, ledger: usize) -> Vec<i64> {
        self.broker.ledger(ledger).positions()
    }

    pub fn values(&self, ledger: usize) -> Vec<f64> {
        self.broker.ledger(ledger).values()
    }

    pub fn profits(&self, ledger: usize) -> Vec<f64> {
        self.broker.ledger(ledger).profits()
    }

    pub fn wealth(&self) -> f64 {
        self.broker.wealth()
    }
}

/// A trading strategy: inspect the tick context, emit orders.
///
/// `reset` is called when the engine is reset between runs; stateful
/// strategies should clear their accumulated state there.
pub trait Strategy {
    fn on_tick(&mut self, ctx: &TickContext<'_>) -> OrderBatch;

    fn reset(&mut self) {}
}
