use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Timestamp;

/// Unique order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Order lifecycle. `Success` and `Expired` are terminal; a `Waiting` order
/// may be retried on later ticks until its validity window lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    Waiting,
    Success,
    Expired,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Success | OrderState::Expired)
    }
}

/// The four raw prices of one asset at one bar, as fed to price evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarPrices {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Resolves an order's target price against the bar it is matched on.
///
/// Implementations must be pure: the same bar always yields the same price.
pub trait PriceEvaluator: fmt::Debug + Send + Sync {
    fn price(&self, bar: &BarPrices) -> f64;
}

/// Open-price-anchored evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EvalOpen {
    /// Fill at the bar's open.
    Exact,
    /// Fill at open plus a fixed offset.
    Plus(f64),
    /// Fill at open times a fixed factor.
    Times(f64),
}

impl PriceEvaluator for EvalOpen {
    fn price(&self, bar: &BarPrices) -> f64 {
        match self {
            EvalOpen::Exact => bar.open,
            EvalOpen::Plus(v) => bar.open + v,
            EvalOpen::Times(v) => bar.open * v,
        }
    }
}

/// A single instruction to trade `volume` units (signed: positive buys,
/// negative sells) of one asset on one ledger.
///
/// `price` is the limit target unless an `evaluator` is attached, in which
/// case the target is resolved against the matching bar first. `value` and
/// `fee` are filled in by the broker on execution.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub state: OrderState,
    pub ledger: usize,
    pub asset: usize,
    pub volume: i64,
    pub price: f64,
    pub evaluator: Option<Arc<dyn PriceEvaluator>>,
    pub value: f64,
    pub fee: f64,
    pub created_at: Timestamp,
    pub valid_from: Timestamp,
    pub valid_until: Timestamp,
    pub processed_at: Option<Timestamp>,
}

impl Order {
    pub fn new(
        ledger: usize,
        asset: usize,
        price: f64,
        volume: i64,
        created_at: Timestamp,
        valid_from: Timestamp,
        valid_until: Timestamp,
    ) -> Self {
        Self {
            id: OrderId::new(),
            state: OrderState::Waiting,
            ledger,
            asset,
            volume,
            price,
            evaluator: None,
            value: 0.0,
            fee: 0.0,
            created_at,
            valid_from,
            valid_until,
            processed_at: None,
        }
    }

    /// Limit order valid for the rest of the creation day (23 hours).
    pub fn at_price(
        ledger: usize,
        asset: usize,
        price: f64,
        volume: i64,
        created_at: Timestamp,
    ) -> Self {
        Self::new(
            ledger,
            asset,
            price,
            volume,
            created_at,
            created_at,
            created_at + Duration::hours(23),
        )
    }

    /// Order whose target price is resolved against the matching bar,
    /// valid for the rest of the creation day.
    pub fn evaluated(
        ledger: usize,
        asset: usize,
        evaluator: Arc<dyn PriceEvaluator>,
        volume: i64,
        created_at: Timestamp,
    ) -> Self {
        let mut order = Self::at_price(ledger, asset, 0.0, volume, created_at);
        order.evaluator = Some(evaluator);
        order
    }

    pub fn is_buy(&self) -> bool {
        self.volume > 0
    }
}

/// Everything a strategy emits on one tick.
#[derive(Debug, Clone, Default)]
pub struct OrderBatch {
    pub orders: Vec<Order>,
}

impl OrderBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, order: Order) {
        self.orders.push(order);
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl IntoIterator for OrderBatch {
    type Item = Order;
    type IntoIter = std::vec::IntoIter<Order>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> Timestamp {
        NaiveDate::from_ymd_opt(2022, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn default_validity_window_is_same_day() {
        let order = Order::at_price(0, 0, 10.0, 100, ts());

        assert_eq!(order.valid_from, ts());
        assert_eq!(order.valid_until, ts() + Duration::hours(23));
        assert_eq!(order.state, OrderState::Waiting);
    }

    #[test]
    fn terminal_states() {
        assert!(!OrderState::Waiting.is_terminal());
        assert!(OrderState::Success.is_terminal());
        assert!(OrderState::Expired.is_terminal());
    }

    #[test]
    fn open_evaluators_resolve_against_bar() {
        let bar = BarPrices {
            open: 10.0,
            high: 12.0,
            low: 9.0,
            close: 11.0,
        };

        assert_eq!(EvalOpen::Exact.price(&bar), 10.0);
        assert_eq!(EvalOpen::Plus(0.5).price(&bar), 10.5);
        assert_eq!(EvalOpen::Times(1.1).price(&bar), 11.0);
    }
}
