//! End-to-end simulation scenarios over in-memory feeds.

use chrono::NaiveDate;
use minerva_broker::Ledger;
use minerva_core::{Commission, Order, OrderBatch, PriceSnapshot, Timestamp};
use minerva_engine::{Engine, EngineError, Strategy, TickContext};
use minerva_feeds::{InMemorySource, PriceFeed};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

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
    s.volume = vec![1_000_000];
    s.validate();
    s
}

fn feed(closes: &[(u32, f64)]) -> Box<dyn PriceFeed> {
    let snaps = closes.iter().map(|&(d, c)| bar(d, c)).collect();
    Box::new(InMemorySource::new("test", vec!["AAA".into()], snaps))
}

/// Buys a fixed lot at the current close on the first tick.
struct BuyOnce {
    volume: i64,
}

impl Strategy for BuyOnce {
    fn on_tick(&mut self, ctx: &TickContext<'_>) -> OrderBatch {
        let mut batch = OrderBatch::new();
        if ctx.tick == 0 {
            let close = ctx.window(0).value(minerva_core::Field::Close, -1, 0);
            batch.push(Order::at_price(0, 0, close, self.volume, ctx.time));
        }
        batch
    }
}

/// Emits one limit order at a price the market never reaches.
struct HopelessLimit;

impl Strategy for HopelessLimit {
    fn on_tick(&mut self, ctx: &TickContext<'_>) -> OrderBatch {
        let mut batch = OrderBatch::new();
        if ctx.tick == 0 {
            batch.push(Order::at_price(0, 0, 50.0, 10, ctx.time));
        }
        batch
    }
}

/// Buys on the first tick, liquidates on `sell_tick`.
struct RoundTrip {
    volume: i64,
    sell_tick: usize,
}

impl Strategy for RoundTrip {
    fn on_tick(&mut self, ctx: &TickContext<'_>) -> OrderBatch {
        let close = ctx.window(0).value(minerva_core::Field::Close, -1, 0);
        let mut batch = OrderBatch::new();
        if ctx.tick == 0 {
            batch.push(Order::at_price(0, 0, close, self.volume, ctx.time));
        } else if ctx.tick == self.sell_tick {
            let held = ctx.position(0, 0);
            if held > 0 {
                batch.push(Order::at_price(0, 0, close, -held, ctx.time));
            }
        }
        batch
    }
}

#[test]
fn marketable_buy_fills_on_its_tick() {
    init_logging();
    let mut engine = Engine::new();
    engine.add_ledger(Ledger::new(10_000.0), feed(&[(1, 100.0), (2, 100.0)]), 4);
    engine.set_strategy(Box::new(BuyOnce { volume: 10 }));

    let summary = engine.run().unwrap();

    assert_eq!(summary.ticks, 2);
    assert_eq!(summary.initial_wealth, 10_000.0);
    assert_eq!(summary.final_wealth, 10_000.0);
    assert_eq!(engine.broker().cash(0), 9_000.0);
    assert_eq!(engine.broker().ledger(0).position(0), 10);
}

#[test]
fn unreachable_limit_expires_without_trading() {
    init_logging();
    let mut engine = Engine::new();
    engine.add_ledger(
        Ledger::new(10_000.0),
        feed(&[(1, 100.0), (2, 100.0), (3, 100.0)]),
        4,
    );
    engine.set_strategy(Box::new(HopelessLimit));

    let summary = engine.run().unwrap();

    assert_eq!(summary.final_wealth, 10_000.0);
    assert_eq!(engine.broker().cash(0), 10_000.0);
    assert_eq!(engine.broker().ledger(0).position(0), 0);
    assert_eq!(engine.broker().ledger(0).reject_stats().expired, 1);
    assert!(engine.broker().ledger(0).pending_orders().is_empty());
}

#[test]
fn cash_is_conserved_across_a_round_trip() {
    init_logging();
    let mut engine = Engine::new();
    let ledger = Ledger::new(10_000.0).with_commission(Commission::flat(0.001));
    engine.add_ledger(ledger, feed(&[(1, 100.0), (2, 105.0), (3, 110.0)]), 4);
    engine.set_strategy(Box::new(RoundTrip {
        volume: 10,
        sell_tick: 2,
    }));

    let summary = engine.run().unwrap();

    // 10000 - 1000 - 1 (buy + fee) + 1100 - 1.1 (sale proceeds - fee)
    let expected = 10_000.0 - 1_000.0 - 1.0 + 1_100.0 - 1.1;
    assert_eq!(engine.broker().ledger(0).position(0), 0);
    assert!((engine.broker().cash(0) - expected).abs() < 1e-9);
    assert!((summary.final_wealth - expected).abs() < 1e-9);
}

#[test]
fn date_range_limits_strategy_activity() {
    init_logging();
    let mut engine = Engine::new();
    engine.add_ledger(
        Ledger::new(10_000.0),
        feed(&[(1, 90.0), (2, 100.0), (3, 110.0), (4, 120.0)]),
        4,
    );
    engine.set_strategy(Box::new(BuyOnce { volume: 10 }));
    engine.set_range(ts(2), ts(3));

    let summary = engine.run().unwrap();

    // Only days 2 and 3 are in range; the first in-range close is 100.
    assert_eq!(summary.ticks, 2);
    assert_eq!(engine.broker().cash(0), 9_000.0);
    // The clock stops on the first tick past the range.
    assert_eq!(engine.time(), Some(ts(4)));
}

#[test]
fn reset_replays_an_identical_run() {
    init_logging();
    let mut engine = Engine::new();
    let ledger = Ledger::new(10_000.0).with_commission(Commission::flat(0.002));
    engine.add_ledger(ledger, feed(&[(1, 100.0), (2, 104.0), (3, 98.0), (4, 101.0)]), 4);
    engine.set_strategy(Box::new(RoundTrip {
        volume: 20,
        sell_tick: 3,
    }));

    let first = engine.run().unwrap();
    let first_history = engine.wealth_history().to_vec();

    engine.reset().unwrap();
    assert!(engine.wealth_history().is_empty());

    let second = engine.run().unwrap();

    assert_eq!(first, second);
    assert_eq!(first_history, engine.wealth_history());
}

#[test]
fn bonus_shares_and_dividend_arrive_on_execute_date() {
    use minerva_core::XrdRecord;

    init_logging();
    let mut engine = Engine::new();
    let mut ledger = Ledger::new(10_000.0);
    ledger.set_xrd(
        0,
        vec![XrdRecord {
            record_date: NaiveDate::from_ymd_opt(2022, 1, 2).unwrap(),
            execute_date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
            bonus_ratio: 2.0,
            rights_ratio: 0.0,
            dividend_per_10: 5.0,
        }],
    );
    engine.add_ledger(ledger, feed(&[(1, 100.0), (2, 100.0), (3, 100.0)]), 4);
    engine.set_strategy(Box::new(BuyOnce { volume: 10 }));

    engine.run().unwrap();

    // 10 held on the record date: 10/10*2 bonus shares, 10/10*5 dividend.
    assert_eq!(engine.broker().ledger(0).position(0), 12);
    assert_eq!(engine.broker().cash(0), 9_005.0);
}

#[test]
fn run_without_strategy_fails() {
    let mut engine = Engine::new();
    engine.add_ledger(Ledger::new(1_000.0), feed(&[(1, 100.0)]), 4);

    assert!(matches!(engine.run(), Err(EngineError::MissingStrategy)));
}
