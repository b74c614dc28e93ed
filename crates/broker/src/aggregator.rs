use minerva_core::{OrderBatch, OrderState, PriceSnapshot, Timestamp};

use crate::ledger::Ledger;

/// Routes strategy output across ledgers and tracks per-ledger and blended
/// wealth over the run.
///
/// Ledger `i` is bound to price feed `i`; every multi-ledger operation takes
/// one snapshot per ledger, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct LedgerAggregator {
    ledgers: Vec<Ledger>,
    wealth_history: Vec<f64>,
    ledger_histories: Vec<Vec<f64>>,
}

impl LedgerAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ledger(&mut self, ledger: Ledger) -> usize {
        self.ledgers.push(ledger);
        self.ledger_histories.push(Vec::new());
        self.ledgers.len() - 1
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }

    pub fn ledger(&self, id: usize) -> &Ledger {
        &self.ledgers[id]
    }

    pub fn ledger_mut(&mut self, id: usize) -> &mut Ledger {
        &mut self.ledgers[id]
    }

    pub fn cash(&self, id: usize) -> f64 {
        self.ledgers[id].cash()
    }

    /// Latest blended wealth; the sum of initial cash before any tick.
    pub fn wealth(&self) -> f64 {
        self.wealth_history
            .last()
            .copied()
            .unwrap_or_else(|| self.ledgers.iter().map(|l| l.cash()).sum())
    }

    pub fn wealth_of(&self, id: usize) -> f64 {
        self.ledger_histories[id]
            .last()
            .copied()
            .unwrap_or_else(|| self.ledgers[id].cash())
    }

    pub fn wealth_history(&self) -> &[f64] {
        &self.wealth_history
    }

    pub fn ledger_wealth_history(&self, id: usize) -> &[f64] {
        &self.ledger_histories[id]
    }

    pub fn positions(&self, id: usize) -> Vec<i64> {
        self.ledgers[id].positions()
    }

    pub fn values(&self, id: usize) -> Vec<f64> {
        self.ledgers[id].values()
    }

    pub fn profits(&self, id: usize) -> Vec<f64> {
        self.ledgers[id].profits()
    }

    pub fn adj_profits(&self, id: usize) -> Vec<f64> {
        self.ledgers[id].adj_profits()
    }

    /// Process a strategy's batch: each order is tried once against its
    /// ledger's current bar, and re-queued for retry if it stays `Waiting`.
    pub fn route(&mut self, batch: OrderBatch, snapshots: &[&PriceSnapshot]) {
        for mut order in batch {
            let id = order.ledger;
            let Some(ledger) = self.ledgers.get_mut(id) else {
                log::warn!("order {} names unknown ledger {}, dropped", order.id, id);
                continue;
            };
            ledger.process(&mut order, snapshots[id]);
            if order.state == OrderState::Waiting {
                ledger.submit(order);
            }
        }
    }

    pub fn retry_pending(&mut self, snapshots: &[&PriceSnapshot]) {
        for (ledger, snap) in self.ledgers.iter_mut().zip(snapshots) {
            ledger.retry_pending(snap);
        }
    }

    pub fn process_xrd(&mut self, time: Timestamp) {
        for ledger in &mut self.ledgers {
            ledger.process_xrd(time);
        }
    }

    /// Mark every live position to market (skipping assets without fresh
    /// data this tick) and append this tick's wealth to the histories.
    ///
    /// Ledger wealth counts open adjustment-driven gains on top of held
    /// value: cash + Σ(value + dyn_adj_profit − profit).
    pub fn revalue(&mut self, snapshots: &[&PriceSnapshot]) {
        let mut blended = 0.0;
        for (id, (ledger, snap)) in self.ledgers.iter_mut().zip(snapshots).enumerate() {
            let portfolio = ledger.portfolio_mut();
            let mut wealth = portfolio.cash;
            for (&asset, item) in portfolio.items.iter_mut() {
                if asset < snap.asset_count() && snap.valid[asset] {
                    item.update_value(snap.time, snap.raw.close[asset], snap.adj.close[asset]);
                }
                wealth += item.value + item.dyn_adj_profit - item.profit;
            }
            portfolio.update_info();
            self.ledger_histories[id].push(wealth);
            blended += wealth;
        }
        self.wealth_history.push(blended);
    }

    pub fn reset(&mut self) {
        for ledger in &mut self.ledgers {
            ledger.reset();
        }
        for history in &mut self.ledger_histories {
            history.clear();
        }
        self.wealth_history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use minerva_core::Order;

    fn ts(day: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2022, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn bar(day: u32, close: f64) -> PriceSnapshot {
        let mut s = PriceSnapshot::with_assets(1);
        s.time = ts(day);
        s.raw.open = vec![close];
        s.raw.high = vec![close];
        s.raw.low = vec![close];
        s.raw.close = vec![close];
        s.adj = s.raw.clone();
        s.validate();
        s
    }

    fn two_ledger_setup() -> LedgerAggregator {
        let mut agg = LedgerAggregator::new();
        for _ in 0..2 {
            let mut ledger = Ledger::new(10_000.0);
            ledger.bind_assets(1);
            agg.add_ledger(ledger);
        }
        agg
    }

    #[test]
    fn routes_orders_to_their_ledger() {
        let mut agg = two_ledger_setup();
        let mut batch = OrderBatch::new();
        batch.push(Order::at_price(0, 0, 100.0, 10, ts(1)));
        batch.push(Order::at_price(1, 0, 200.0, 5, ts(1)));

        let day1 = [bar(1, 100.0), bar(1, 200.0)];
        agg.route(batch, &[&day1[0], &day1[1]]);

        assert_eq!(agg.ledger(0).position(0), 10);
        assert_eq!(agg.ledger(1).position(0), 5);
        assert_eq!(agg.cash(0), 9_000.0);
        assert_eq!(agg.cash(1), 9_000.0);
    }

    #[test]
    fn waiting_orders_are_requeued_and_filled_later() {
        let mut agg = two_ledger_setup();
        let mut batch = OrderBatch::new();
        batch.push(Order::at_price(0, 0, 90.0, 10, ts(1)));

        let day1 = [bar(1, 100.0), bar(1, 200.0)];
        agg.route(batch, &[&day1[0], &day1[1]]);
        assert_eq!(agg.ledger(0).pending_orders().len(), 1);

        // Price reaches the limit within the validity window.
        let day1_later = [bar(1, 90.0), bar(1, 200.0)];
        agg.retry_pending(&[&day1_later[0], &day1_later[1]]);
        assert_eq!(agg.ledger(0).position(0), 10);
        assert!(agg.ledger(0).pending_orders().is_empty());
    }

    #[test]
    fn revaluation_tracks_blended_wealth() {
        let mut agg = two_ledger_setup();
        let mut batch = OrderBatch::new();
        batch.push(Order::at_price(0, 0, 100.0, 10, ts(1)));
        let day1 = [bar(1, 100.0), bar(1, 200.0)];
        agg.route(batch, &[&day1[0], &day1[1]]);
        agg.revalue(&[&day1[0], &day1[1]]);

        // Flat day: wealth unchanged.
        assert_eq!(agg.wealth(), 20_000.0);

        // Asset rallies 10%.
        let day2 = [bar(2, 110.0), bar(2, 200.0)];
        agg.revalue(&[&day2[0], &day2[1]]);
        assert_eq!(agg.wealth(), 20_100.0);
        assert_eq!(agg.wealth_of(0), 10_100.0);
        assert_eq!(agg.wealth_of(1), 10_000.0);
        assert_eq!(agg.wealth_history(), &[20_000.0, 20_100.0]);
    }

    #[test]
    fn revaluation_skips_assets_without_fresh_data() {
        let mut agg = two_ledger_setup();
        let mut batch = OrderBatch::new();
        batch.push(Order::at_price(0, 0, 100.0, 10, ts(1)));
        let day1 = [bar(1, 100.0), bar(1, 200.0)];
        agg.route(batch, &[&day1[0], &day1[1]]);
        agg.revalue(&[&day1[0], &day1[1]]);

        // Placeholder tick: position keeps its last value.
        let gap = [
            PriceSnapshot::placeholder(1, ts(2)),
            PriceSnapshot::placeholder(1, ts(2)),
        ];
        agg.revalue(&[&gap[0], &gap[1]]);
        assert_eq!(agg.wealth(), 20_000.0);

        // Idempotent on repeated identical bars.
        let day3 = [bar(3, 100.0), bar(3, 200.0)];
        agg.revalue(&[&day3[0], &day3[1]]);
        agg.revalue(&[&day3[0], &day3[1]]);
        let history = agg.ledger_wealth_history(0);
        assert_eq!(history[history.len() - 1], history[history.len() - 2]);
    }

    #[test]
    fn reset_clears_positions_and_histories() {
        let mut agg = two_ledger_setup();
        let mut batch = OrderBatch::new();
        batch.push(Order::at_price(0, 0, 100.0, 10, ts(1)));
        let day1 = [bar(1, 100.0), bar(1, 200.0)];
        agg.route(batch, &[&day1[0], &day1[1]]);
        agg.revalue(&[&day1[0], &day1[1]]);

        agg.reset();

        assert_eq!(agg.wealth(), 20_000.0);
        assert!(agg.wealth_history().is_empty());
        assert_eq!(agg.ledger(0).position(0), 0);
    }
}
