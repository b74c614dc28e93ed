use minerva_broker::{Ledger, LedgerAggregator};
use minerva_core::{PriceSnapshot, Timestamp};
use minerva_feeds::error::FeedError;
use minerva_feeds::source::{CommonFeed, PriceFeed};
use minerva_feeds::sync::{CommonFeedSynchronizer, PriceFeedSynchronizer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::{Strategy, TickContext};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no strategy configured")]
    MissingStrategy,

    #[error(transparent)]
    Feed(#[from] FeedError),
}

/// What a run produced, beyond the histories kept by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: usize,
    pub initial_wealth: f64,
    pub final_wealth: f64,
}

/// The simulation orchestrator.
///
/// Owns the synchronizers, the ledger aggregator and the strategy. Ledger
/// `i` is bound to price feed `i` by `add_ledger`. `run` consumes the merged
/// tick stream; `reset` rewinds everything so the same engine can run again
/// (parameter sweeps, repeated evaluations over synthetic feeds).
#[derive(Default)]
pub struct Engine {
    prices: PriceFeedSynchronizer,
    commons: CommonFeedSynchronizer,
    broker: LedgerAggregator,
    strategy: Option<Box<dyn Strategy>>,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a ledger to a price feed, with a look-back window of `window`
    /// ticks. Returns the ledger id.
    pub fn add_ledger(&mut self, mut ledger: Ledger, feed: Box<dyn PriceFeed>, window: usize) -> usize {
        ledger.bind_assets(feed.asset_count());
        self.prices.add_feed(feed, window);
        self.broker.add_ledger(ledger)
    }

    pub fn add_common_feed(&mut self, feed: Box<dyn CommonFeed>, window: usize) {
        self.commons.add_feed(feed, window);
    }

    pub fn set_strategy(&mut self, strategy: Box<dyn Strategy>) {
        self.strategy = Some(strategy);
    }

    /// Restrict the run to `[start, end]` on the global clock. Ticks before
    /// `start` still feed the windows but see no strategy or broker
    /// activity; the run stops after `end`.
    pub fn set_range(&mut self, start: Timestamp, end: Timestamp) {
        self.start = Some(start);
        self.end = Some(end);
    }

    pub fn broker(&self) -> &LedgerAggregator {
        &self.broker
    }

    pub fn time(&self) -> Option<Timestamp> {
        self.prices.time()
    }

    pub fn wealth_history(&self) -> &[f64] {
        self.broker.wealth_history()
    }

    pub fn ledger_wealth_history(&self, ledger: usize) -> &[f64] {
        self.broker.ledger_wealth_history(ledger)
    }

    /// Drive the simulation to exhaustion (or the end of the configured
    /// range).
    pub fn run(&mut self) -> Result<RunSummary, EngineError> {
        let mut strategy = self.strategy.take().ok_or(EngineError::MissingStrategy)?;
        let initial_wealth = self.broker.wealth();
        let mut ticks = 0usize;
        log::info!(
            "starting run: {} ledgers, {} common feeds, initial wealth {:.2}",
            self.broker.len(),
            self.commons.len(),
            initial_wealth
        );

        while self.prices.advance()? {
            let Some(time) = self.prices.time() else {
                break;
            };
            if self.end.is_some_and(|end| time > end) {
                break;
            }
            if !self.commons.is_empty() {
                self.commons.advance()?;
            }
            if self.start.is_some_and(|start| time < start) {
                continue;
            }

            let Some(snapshots) = latest_snapshots(&self.prices) else {
                break;
            };

            self.broker.retry_pending(&snapshots);

            let batch = {
                let ctx = TickContext {
                    time,
                    tick: ticks,
                    prices: &self.prices,
                    commons: &self.commons,
                    broker: &self.broker,
                };
                strategy.on_tick(&ctx)
            };
            self.broker.route(batch, &snapshots);
            self.broker.process_xrd(time);
            self.broker.revalue(&snapshots);
            ticks += 1;
        }

        self.strategy = Some(strategy);
        let final_wealth = self.broker.wealth();
        log::info!(
            "run finished: {} ticks, final wealth {:.2}",
            ticks,
            final_wealth
        );
        Ok(RunSummary {
            ticks,
            initial_wealth,
            final_wealth,
        })
    }

    /// Rewind feeds, windows, ledgers, histories and the strategy to their
    /// initial state. A reset engine replays an identical run.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.prices.reset()?;
        self.commons.reset()?;
        self.broker.reset();
        if let Some(strategy) = &mut self.strategy {
            strategy.reset();
        }
        Ok(())
    }
}

// Every window holds at least the current tick's row (real or placeholder)
// once advance succeeded.
fn latest_snapshots(sync: &PriceFeedSynchronizer) -> Option<Vec<&PriceSnapshot>> {
    sync.windows().iter().map(|w| w.latest()).collect()
}
