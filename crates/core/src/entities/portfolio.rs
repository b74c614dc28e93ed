use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::Duration;

use crate::entities::Order;
use crate::Timestamp;

/// Accounting state for one held asset.
///
/// `profit` accrues against raw prices, `adj_profit` against adjusted
/// prices. `dyn_adj_profit` starts as the adjusted profit and is drained as
/// partial sells extract realized gains into cash, so `dyn_adj_profit -
/// profit` is always the adjustment-driven gain still attached to the open
/// position.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioPosition {
    pub position: i64,
    pub prev_price: f64,
    pub prev_adj_price: f64,
    pub buying_time: Timestamp,
    pub holding_time: Duration,
    pub value: f64,
    pub profit: f64,
    pub adj_profit: f64,
    pub dyn_adj_profit: f64,
}

impl PortfolioPosition {
    /// Empty entry anchored at `time`, used for non-market stock transfers.
    fn opened(time: Timestamp) -> Self {
        Self {
            position: 0,
            prev_price: 0.0,
            prev_adj_price: 0.0,
            buying_time: time,
            holding_time: Duration::zero(),
            value: 0.0,
            profit: 0.0,
            adj_profit: 0.0,
            dyn_adj_profit: 0.0,
        }
    }

    /// Mark the position to market, accruing the price move since the last
    /// anchor into the profit accumulators and refreshing the anchors.
    pub fn update_value(&mut self, time: Timestamp, price: f64, adj_price: f64) {
        self.value = price * self.position as f64;
        self.profit += (price - self.prev_price) * self.position as f64;
        let adj_delta = (adj_price - self.prev_adj_price) * self.position as f64;
        self.adj_profit += adj_delta;
        self.dyn_adj_profit += adj_delta;
        self.prev_price = price;
        self.prev_adj_price = adj_price;
        self.holding_time = time - self.buying_time;
    }
}

/// Cash plus per-asset positions of one ledger.
///
/// An entry exists in `items` exactly while its position is non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub items: BTreeMap<usize, PortfolioPosition>,
    pub total_value: f64,
}

impl Portfolio {
    pub fn new(cash: f64) -> Self {
        Self {
            cash,
            items: BTreeMap::new(),
            total_value: cash,
        }
    }

    /// Apply a filled order. The order carries its executed `price`, signed
    /// `volume`, `value` and `fee`; `adj_price` is the matching bar's
    /// adjusted close.
    pub fn apply_fill(&mut self, order: &Order, adj_price: f64) {
        self.cash -= order.value + order.fee;
        match self.items.entry(order.asset) {
            Entry::Occupied(mut entry) => {
                let item = entry.get_mut();
                debug_assert!(item.position != 0, "held entry with zero position");
                if order.volume > 0 {
                    // Adding to the position: accrue the move from the
                    // standing anchor to the fill price. The anchor itself
                    // only moves on revaluation.
                    item.profit += (order.price - item.prev_price) * item.position as f64;
                    let adj_delta = (adj_price - item.prev_adj_price) * item.position as f64;
                    item.adj_profit += adj_delta;
                    item.dyn_adj_profit += adj_delta;
                } else {
                    // Reducing: the sold fraction takes its share of the
                    // adjustment-driven gain out as cash.
                    let fraction = (-order.volume) as f64 / item.position as f64;
                    let cash_diff = (item.dyn_adj_profit - item.profit) * fraction;
                    self.cash += cash_diff;
                    item.dyn_adj_profit -= cash_diff;
                }
                item.position += order.volume;
                item.value += order.value;
                if item.position == 0 {
                    entry.remove();
                }
            }
            Entry::Vacant(slot) => {
                let time = order.processed_at.unwrap_or(order.created_at);
                slot.insert(PortfolioPosition {
                    position: order.volume,
                    prev_price: order.price,
                    prev_adj_price: adj_price,
                    buying_time: time,
                    holding_time: Duration::zero(),
                    value: order.price * order.volume as f64,
                    profit: -order.fee,
                    adj_profit: -order.fee,
                    dyn_adj_profit: -order.fee,
                });
            }
        }
    }

    /// Refresh the cached `total_value` after position updates.
    pub fn update_info(&mut self) {
        self.total_value = self.cash + self.items.values().map(|item| item.value).sum::<f64>();
    }

    /// Adjust a position without a market trade (bonus/rights shares).
    /// Cost-basis anchors are left untouched.
    pub fn transfer_stock(&mut self, time: Timestamp, asset: usize, volume: i64) {
        if volume == 0 {
            return;
        }
        let item = self
            .items
            .entry(asset)
            .or_insert_with(|| PortfolioPosition::opened(time));
        item.position += volume;
        item.value = item.prev_price * item.position as f64;
        if item.position == 0 {
            self.items.remove(&asset);
        }
    }

    /// Credit (or debit) cash without a market trade (dividends).
    pub fn transfer_cash(&mut self, amount: f64) {
        self.cash += amount;
    }

    pub fn position(&self, asset: usize) -> i64 {
        self.items.get(&asset).map_or(0, |item| item.position)
    }

    pub fn profit(&self, asset: usize) -> f64 {
        self.items.get(&asset).map_or(0.0, |item| item.profit)
    }

    pub fn positions(&self, assets: usize) -> Vec<i64> {
        self.dense(assets, |item| item.position)
    }

    pub fn values(&self, assets: usize) -> Vec<f64> {
        self.dense(assets, |item| item.value)
    }

    pub fn profits(&self, assets: usize) -> Vec<f64> {
        self.dense(assets, |item| item.profit)
    }

    pub fn adj_profits(&self, assets: usize) -> Vec<f64> {
        self.dense(assets, |item| item.adj_profit)
    }

    pub fn dyn_adj_profits(&self, assets: usize) -> Vec<f64> {
        self.dense(assets, |item| item.dyn_adj_profit)
    }

    fn dense<T: Default + Copy>(
        &self,
        assets: usize,
        get: impl Fn(&PortfolioPosition) -> T,
    ) -> Vec<T> {
        let mut out = vec![T::default(); assets];
        for (&asset, item) in &self.items {
            if asset < assets {
                out[asset] = get(item);
            }
        }
        out
    }

    pub fn reset(&mut self, cash: f64) {
        self.cash = cash;
        self.items.clear();
        self.total_value = cash;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2022, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn filled(asset: usize, price: f64, volume: i64, fee: f64, day: u32) -> Order {
        let mut order = Order::at_price(0, asset, price, volume, ts(day));
        order.value = price * volume as f64;
        order.fee = fee;
        order.processed_at = Some(ts(day));
        order
    }

    #[test]
    fn buy_opens_entry_with_fee_loaded_accumulators() {
        let mut p = Portfolio::new(10_000.0);
        p.apply_fill(&filled(0, 100.0, 10, 10.0, 1), 100.0);

        assert_eq!(p.cash, 8_990.0);
        let item = &p.items[&0];
        assert_eq!(item.position, 10);
        assert_eq!(item.value, 1_000.0);
        assert_eq!(item.profit, -10.0);
        assert_eq!(item.adj_profit, -10.0);
        assert_eq!(item.dyn_adj_profit, -10.0);
    }

    #[test]
    fn mark_to_market_accrues_against_anchor() {
        let mut p = Portfolio::new(10_000.0);
        p.apply_fill(&filled(0, 100.0, 10, 10.0, 1), 100.0);
        p.items.get_mut(&0).unwrap().update_value(ts(2), 110.0, 120.0);

        let item = &p.items[&0];
        assert_eq!(item.value, 1_100.0);
        assert_eq!(item.profit, 90.0);
        assert_eq!(item.adj_profit, 190.0);
        assert_eq!(item.dyn_adj_profit, 190.0);
        assert_eq!(item.holding_time, Duration::days(1));
    }

    #[test]
    fn adding_to_a_position_accrues_without_moving_the_anchor() {
        let mut p = Portfolio::new(10_000.0);
        p.apply_fill(&filled(0, 100.0, 10, 0.0, 1), 100.0);
        p.items.get_mut(&0).unwrap().update_value(ts(2), 110.0, 110.0);
        // Add 10 below the anchor: the open move settles at the fill,
        // but the anchor stays where the last revaluation left it.
        p.apply_fill(&filled(0, 105.0, 10, 0.0, 2), 105.0);

        let item = &p.items[&0];
        assert_eq!(item.profit, 100.0 - 50.0);
        assert_eq!(item.prev_price, 110.0);
        assert_eq!(item.value, 1_100.0 + 1_050.0);

        // Revaluing back at the anchor price adds nothing.
        p.items.get_mut(&0).unwrap().update_value(ts(3), 110.0, 110.0);
        assert_eq!(p.items[&0].profit, 50.0);
        assert_eq!(p.items[&0].value, 2_200.0);
    }

    #[test]
    fn partial_sell_extracts_proportional_adjustment_gain() {
        let mut p = Portfolio::new(10_000.0);
        p.apply_fill(&filled(0, 100.0, 10, 10.0, 1), 100.0);
        p.items.get_mut(&0).unwrap().update_value(ts(2), 110.0, 120.0);
        // Sell half: proceeds 550 minus fee 1, plus half of the
        // adjustment-driven gain (190 - 90) / 2 = 50.
        p.apply_fill(&filled(0, 110.0, -5, 1.0, 2), 120.0);

        assert_eq!(p.cash, 8_990.0 + 549.0 + 50.0);
        let item = &p.items[&0];
        assert_eq!(item.position, 5);
        assert_eq!(item.value, 550.0);
        assert_eq!(item.dyn_adj_profit, 140.0);
        assert_eq!(item.profit, 90.0);
    }

    #[test]
    fn full_sell_removes_entry() {
        let mut p = Portfolio::new(10_000.0);
        p.apply_fill(&filled(0, 100.0, 10, 0.0, 1), 100.0);
        p.apply_fill(&filled(0, 100.0, -10, 0.0, 2), 100.0);

        assert!(p.items.is_empty());
        assert_eq!(p.position(0), 0);
        assert_eq!(p.cash, 10_000.0);
    }

    #[test]
    fn total_value_is_cash_plus_position_values() {
        let mut p = Portfolio::new(10_000.0);
        p.apply_fill(&filled(0, 100.0, 10, 0.0, 1), 100.0);
        p.apply_fill(&filled(1, 50.0, 20, 0.0, 1), 50.0);
        p.update_info();

        assert_eq!(p.total_value, p.cash + 1_000.0 + 1_000.0);
    }

    #[test]
    fn transfers_bypass_cost_anchors() {
        let mut p = Portfolio::new(1_000.0);
        p.apply_fill(&filled(0, 100.0, 10, 0.0, 1), 100.0);
        p.transfer_stock(ts(2), 0, 5);
        p.transfer_cash(30.0);

        let item = &p.items[&0];
        assert_eq!(item.position, 15);
        assert_eq!(item.prev_price, 100.0);
        assert_eq!(item.value, 1_500.0);
        assert_eq!(p.cash, 1_000.0 - 1_000.0 + 30.0);
    }

    #[test]
    fn dense_accessors_fill_missing_assets_with_defaults() {
        let mut p = Portfolio::new(1_000.0);
        p.apply_fill(&filled(1, 10.0, 3, 0.0, 1), 10.0);

        assert_eq!(p.positions(3), vec![0, 3, 0]);
        assert_eq!(p.values(3), vec![0.0, 30.0, 0.0]);
    }
}
