use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use minerva_core::{Portfolio, Timestamp, XrdRecord};
use minerva_feeds::error::FeedError;
use minerva_feeds::time::TimeConverter;

/// Column map for per-asset corporate-action files.
#[derive(Debug, Clone)]
pub struct XrdLayout {
    pub record_date: usize,
    pub execute_date: usize,
    pub bonus_ratio: usize,
    pub rights_ratio: usize,
    pub dividend_per_10: usize,
}

impl Default for XrdLayout {
    fn default() -> Self {
        Self {
            record_date: 0,
            execute_date: 1,
            bonus_ratio: 2,
            rights_ratio: 3,
            dividend_per_10: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Adjustment {
    asset: usize,
    shares: i64,
    cash: f64,
}

/// Two-phase ex-rights/ex-dividend processor for one ledger.
///
/// Register phase: when an asset's next unconsumed record hits its record
/// date, the entitlement is measured from the position held right then and
/// filed under the record's execute date. Execute phase: every adjustment
/// filed for today is applied as a stock/cash transfer. The split matters:
/// position changes between the two dates must not change the entitlement.
#[derive(Debug, Clone, Default)]
pub struct XrdProcessor {
    records: BTreeMap<usize, Vec<XrdRecord>>,
    cursors: BTreeMap<usize, usize>,
    scheduled: BTreeMap<NaiveDate, Vec<Adjustment>>,
}

impl XrdProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the record calendar of one asset (sorted by record date).
    pub fn register(&mut self, asset: usize, mut records: Vec<XrdRecord>) {
        records.sort_by_key(|r| r.record_date);
        self.records.insert(asset, records);
        self.cursors.insert(asset, 0);
    }

    /// Load per-asset record files named `<code>.csv` from a directory.
    /// Assets without a file simply have no corporate actions.
    pub fn load_dir(
        &mut self,
        dir: impl AsRef<Path>,
        codes: &[String],
        layout: &XrdLayout,
        converter: TimeConverter,
    ) -> Result<(), FeedError> {
        let dir = dir.as_ref();
        for (asset, code) in codes.iter().enumerate() {
            let path = dir.join(format!("{code}.csv"));
            if !path.is_file() {
                continue;
            }
            let records = load_xrd_file(&path, layout, converter)?;
            self.register(asset, records);
        }
        Ok(())
    }

    /// Run both phases for the tick at `time`.
    pub fn run(&mut self, time: Timestamp, portfolio: &mut Portfolio) {
        let today = time.date();

        for (&asset, records) in &self.records {
            let cursor = self.cursors.entry(asset).or_insert(0);
            while let Some(record) = records.get(*cursor) {
                if record.record_date > today {
                    break;
                }
                if record.record_date == today {
                    let position = portfolio.position(asset);
                    if position > 0 {
                        let shares = record.shares_for(position);
                        let cash = record.cash_for(position);
                        if shares != 0 || cash != 0.0 {
                            log::debug!(
                                "asset {} entitled to {} shares and {:.4} cash on {}, due {}",
                                asset,
                                shares,
                                cash,
                                today,
                                record.execute_date
                            );
                            self.scheduled.entry(record.execute_date).or_default().push(
                                Adjustment {
                                    asset,
                                    shares,
                                    cash,
                                },
                            );
                        }
                    }
                }
                *cursor += 1;
            }
        }

        while let Some(entry) = self.scheduled.first_entry() {
            if *entry.key() > today {
                break;
            }
            for adj in entry.remove() {
                portfolio.transfer_stock(time, adj.asset, adj.shares);
                portfolio.transfer_cash(adj.cash);
            }
        }
    }

    /// Forget consumed records and pending adjustments for a fresh run.
    pub fn reset(&mut self) {
        for cursor in self.cursors.values_mut() {
            *cursor = 0;
        }
        self.scheduled.clear();
    }
}

fn load_xrd_file(
    path: &Path,
    layout: &XrdLayout,
    converter: TimeConverter,
) -> Result<Vec<XrdRecord>, FeedError> {
    let shown = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_err(&shown, e))?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_err(&shown, e))?;
        let date = |idx: usize| -> Result<NaiveDate, FeedError> {
            let cell = record.get(idx).unwrap_or_default();
            converter(cell)
                .map(|t| t.date())
                .ok_or_else(|| FeedError::BadTimestamp {
                    path: shown.clone(),
                    value: cell.to_owned(),
                })
        };
        let ratio = |idx: usize| -> f64 {
            let cell = record.get(idx).unwrap_or_default().trim();
            cell.parse::<f64>().unwrap_or_else(|_| {
                log::warn!("unparseable ratio {:?} in {}, treating as zero", cell, shown);
                0.0
            })
        };

        records.push(XrdRecord {
            record_date: date(layout.record_date)?,
            execute_date: date(layout.execute_date)?,
            bonus_ratio: ratio(layout.bonus_ratio),
            rights_ratio: ratio(layout.rights_ratio),
            dividend_per_10: ratio(layout.dividend_per_10),
        });
    }
    Ok(records)
}

fn csv_err(path: &str, source: csv::Error) -> FeedError {
    FeedError::Csv {
        path: path.to_owned(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use minerva_core::Order;

    fn ts(day: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2022, 5, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 5, d).unwrap()
    }

    fn held(portfolio: &mut Portfolio, asset: usize, volume: i64, price: f64) {
        let mut order = Order::at_price(0, asset, price, volume, ts(1));
        order.value = price * volume as f64;
        order.processed_at = Some(ts(1));
        portfolio.apply_fill(&order, price);
    }

    fn record(rec: u32, exec: u32) -> XrdRecord {
        XrdRecord {
            record_date: day(rec),
            execute_date: day(exec),
            bonus_ratio: 2.0,
            rights_ratio: 0.0,
            dividend_per_10: 5.0,
        }
    }

    #[test]
    fn entitlement_measured_on_record_date_lands_on_execute_date() {
        let mut portfolio = Portfolio::new(10_000.0);
        held(&mut portfolio, 0, 25, 10.0);
        let cash_after_buy = portfolio.cash;

        let mut xrd = XrdProcessor::new();
        xrd.register(0, vec![record(10, 12)]);

        // Record date: measured, nothing applied yet.
        xrd.run(ts(10), &mut portfolio);
        assert_eq!(portfolio.position(0), 25);
        assert_eq!(portfolio.cash, cash_after_buy);

        // Position changes in between must not change the entitlement.
        held(&mut portfolio, 0, 100, 10.0);

        // Execute date: 25/10*2 = 5 shares, 25/10*5 = 12.5 cash.
        xrd.run(ts(12), &mut portfolio);
        assert_eq!(portfolio.position(0), 130);
        assert_eq!(portfolio.cash, cash_after_buy - 1_000.0 + 12.5);
    }

    #[test]
    fn unheld_asset_earns_nothing() {
        let mut portfolio = Portfolio::new(1_000.0);
        let mut xrd = XrdProcessor::new();
        xrd.register(0, vec![record(10, 12)]);

        xrd.run(ts(10), &mut portfolio);
        xrd.run(ts(12), &mut portfolio);

        assert_eq!(portfolio.position(0), 0);
        assert_eq!(portfolio.cash, 1_000.0);
    }

    #[test]
    fn stale_records_are_skipped_not_applied() {
        let mut portfolio = Portfolio::new(1_000.0);
        held(&mut portfolio, 0, 10, 10.0);
        let mut xrd = XrdProcessor::new();
        xrd.register(0, vec![record(2, 3), record(10, 11)]);

        // First tick is already past the first record's dates.
        xrd.run(ts(8), &mut portfolio);
        assert_eq!(portfolio.position(0), 10);

        xrd.run(ts(10), &mut portfolio);
        xrd.run(ts(11), &mut portfolio);
        assert_eq!(portfolio.position(0), 12);
    }

    #[test]
    fn reset_restores_the_full_calendar() {
        let mut portfolio = Portfolio::new(1_000.0);
        held(&mut portfolio, 0, 10, 10.0);
        let mut xrd = XrdProcessor::new();
        xrd.register(0, vec![record(10, 12)]);
        xrd.run(ts(10), &mut portfolio);
        xrd.reset();

        // Re-run from scratch: the record is live again.
        let mut portfolio = Portfolio::new(1_000.0);
        held(&mut portfolio, 0, 10, 10.0);
        xrd.run(ts(10), &mut portfolio);
        xrd.run(ts(12), &mut portfolio);
        assert_eq!(portfolio.position(0), 12);
    }

    #[test]
    fn loads_per_asset_files_by_code() {
        use minerva_feeds::time::parse_delimited_date;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("AAA.csv")).unwrap();
        f.write_all(
            b"record,execute,bonus,rights,dividend\n2022-05-10,2022-05-12,2.0,0.0,5.0\n",
        )
        .unwrap();

        let mut xrd = XrdProcessor::new();
        xrd.load_dir(
            dir.path(),
            &["AAA".to_owned(), "BBB".to_owned()],
            &XrdLayout::default(),
            parse_delimited_date,
        )
        .unwrap();

        let mut portfolio = Portfolio::new(1_000.0);
        held(&mut portfolio, 0, 10, 10.0);
        xrd.run(ts(10), &mut portfolio);
        xrd.run(ts(12), &mut portfolio);
        assert_eq!(portfolio.position(0), 12);
        assert_eq!(portfolio.cash, 1_000.0 - 100.0 + 5.0);
    }
}
