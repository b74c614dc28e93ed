use minerva_core::{Commission, Order, OrderState, Portfolio, PriceSnapshot, Tax, Timestamp, XrdRecord};
use serde::{Deserialize, Serialize};

use crate::xrd::XrdProcessor;

/// Why orders failed to fill. Rejections are diagnostics, not errors: a
/// rejected order simply stays `Waiting` until it expires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectStats {
    pub expired: usize,
    pub invalid_asset: usize,
    pub price_unreachable: usize,
    pub insufficient_cash: usize,
    pub short_disallowed: usize,
}

/// One account: cash, positions, fee schedules, trading policies and the
/// queue of orders still waiting for their fill conditions.
#[derive(Debug, Clone)]
pub struct Ledger {
    portfolio: Portfolio,
    initial_cash: f64,
    assets: usize,
    commission: Commission,
    tax: Tax,
    allow_short: bool,
    allow_default: bool,
    pending: Vec<Order>,
    rejects: RejectStats,
    xrd: XrdProcessor,
}

impl Ledger {
    pub fn new(cash: f64) -> Self {
        Self {
            portfolio: Portfolio::new(cash),
            initial_cash: cash,
            assets: 0,
            commission: Commission::default(),
            tax: Tax::default(),
            allow_short: false,
            allow_default: false,
            pending: Vec::new(),
            rejects: RejectStats::default(),
            xrd: XrdProcessor::new(),
        }
    }

    pub fn with_commission(mut self, commission: Commission) -> Self {
        self.commission = commission;
        self
    }

    pub fn with_tax(mut self, tax: Tax) -> Self {
        self.tax = tax;
        self
    }

    /// Allow selling assets that are not held (negative positions).
    pub fn allow_short(mut self, allow: bool) -> Self {
        self.allow_short = allow;
        self
    }

    /// Allow buying beyond available cash (negative cash).
    pub fn allow_default(mut self, allow: bool) -> Self {
        self.allow_default = allow;
        self
    }

    /// Register the corporate-action calendar for one asset.
    pub fn set_xrd(&mut self, asset: usize, records: Vec<XrdRecord>) {
        self.xrd.register(asset, records);
    }

    pub fn xrd_mut(&mut self) -> &mut XrdProcessor {
        &mut self.xrd
    }

    /// Set once when the ledger is bound to its price feed.
    pub fn bind_assets(&mut self, assets: usize) {
        self.assets = assets;
    }

    pub fn asset_count(&self) -> usize {
        self.assets
    }

    pub fn cash(&self) -> f64 {
        self.portfolio.cash
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub(crate) fn portfolio_mut(&mut self) -> &mut Portfolio {
        &mut self.portfolio
    }

    pub fn position(&self, asset: usize) -> i64 {
        self.portfolio.position(asset)
    }

    pub fn positions(&self) -> Vec<i64> {
        self.portfolio.positions(self.assets)
    }

    pub fn values(&self) -> Vec<f64> {
        self.portfolio.values(self.assets)
    }

    pub fn profits(&self) -> Vec<f64> {
        self.portfolio.profits(self.assets)
    }

    pub fn adj_profits(&self) -> Vec<f64> {
        self.portfolio.adj_profits(self.assets)
    }

    pub fn reject_stats(&self) -> RejectStats {
        self.rejects
    }

    pub fn pending_orders(&self) -> &[Order] {
        &self.pending
    }

    /// Queue an order for retry on subsequent ticks.
    pub fn submit(&mut self, order: Order) {
        self.pending.push(order);
    }

    /// Run the fill state machine for one order against one bar. Terminal
    /// outcomes (`Success`, `Expired`) are stamped on the order; every other
    /// outcome leaves it `Waiting` and bumps a diagnostic counter.
    pub fn process(&mut self, order: &mut Order, snap: &PriceSnapshot) {
        if order.state.is_terminal() {
            return;
        }

        if snap.time > order.valid_until {
            order.state = OrderState::Expired;
            self.rejects.expired += 1;
            log::debug!("order {} expired at {}", order.id, snap.time);
            return;
        }
        if snap.time < order.valid_from {
            return;
        }

        if order.asset >= snap.asset_count() || !snap.valid[order.asset] {
            self.rejects.invalid_asset += 1;
            return;
        }

        if let Some(evaluator) = &order.evaluator {
            order.price = evaluator.price(&snap.bar(order.asset));
        }
        let price = order.price;
        if price < snap.raw.low[order.asset] || price > snap.raw.high[order.asset] {
            self.rejects.price_unreachable += 1;
            return;
        }

        let fee = self.commission.charge(price, order.volume) + self.tax.charge(price, order.volume);
        let value = price * order.volume as f64;

        if order.is_buy() {
            if !self.allow_default && self.portfolio.cash <= value + fee {
                self.rejects.insufficient_cash += 1;
                log::debug!(
                    "order {} rejected: needs {:.2}, cash {:.2}",
                    order.id,
                    value + fee,
                    self.portfolio.cash
                );
                return;
            }
        } else if !self.allow_short && self.portfolio.position(order.asset) + order.volume < 0 {
            self.rejects.short_disallowed += 1;
            return;
        }

        // All-or-nothing fill.
        order.value = value;
        order.fee = fee;
        order.state = OrderState::Success;
        order.processed_at = Some(snap.time);
        self.portfolio
            .apply_fill(order, snap.adj.close[order.asset]);
        log::debug!(
            "order {} filled: asset {} volume {} @ {:.4} fee {:.4}",
            order.id,
            order.asset,
            order.volume,
            price,
            fee
        );
    }

    /// Re-run the queue against a fresh bar, dropping every order that
    /// reached a terminal state.
    pub fn retry_pending(&mut self, snap: &PriceSnapshot) {
        let mut queue = std::mem::take(&mut self.pending);
        queue.retain_mut(|order| {
            self.process(order, snap);
            order.state == OrderState::Waiting
        });
        self.pending = queue;
    }

    /// Corporate-action pass for this tick: measure holdings on record
    /// dates, apply adjustments due today.
    pub fn process_xrd(&mut self, time: Timestamp) {
        self.xrd.run(time, &mut self.portfolio);
    }

    /// Restore initial cash and clear positions, queue, diagnostics and any
    /// scheduled corporate-action state.
    pub fn reset(&mut self) {
        self.portfolio.reset(self.initial_cash);
        self.pending.clear();
        self.rejects = RejectStats::default();
        self.xrd.reset();
    }
}
