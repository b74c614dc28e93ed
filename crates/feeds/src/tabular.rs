use std::path::Path;

use minerva_core::{PriceSnapshot, Timestamp};

use crate::error::FeedError;
use crate::source::PriceFeed;
use crate::time::TimeConverter;

/// Volume reported by sources that carry no real volume data. Deep enough
/// that volume never constrains a fill.
pub(crate) const DEEP_BOOK_VOLUME: i64 = 1_000_000_000_000;

/// Price feed over a single close-price matrix file: first column the
/// timestamp, one column per asset. OHLC collapse to the single price.
///
/// An optional parallel file supplies adjusted prices; its calendar must
/// match the raw file's row for row.
#[derive(Debug, Clone)]
pub struct CsvTabularSource {
    name: String,
    codes: Vec<String>,
    snapshots: Vec<PriceSnapshot>,
    cursor: usize,
}

impl CsvTabularSource {
    pub fn new(path: impl AsRef<Path>, converter: TimeConverter) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let (codes, rows) = load_matrix(path, converter)?;
        let snapshots = rows
            .into_iter()
            .map(|(time, prices)| build_snapshot(time, &prices, &prices))
            .collect();
        Ok(Self {
            name: display_name(path),
            codes,
            snapshots,
            cursor: 0,
        })
    }

    pub fn with_adjusted(
        raw_path: impl AsRef<Path>,
        adjusted_path: impl AsRef<Path>,
        converter: TimeConverter,
    ) -> Result<Self, FeedError> {
        let raw_path = raw_path.as_ref();
        let adjusted_path = adjusted_path.as_ref();
        let (codes, raw_rows) = load_matrix(raw_path, converter)?;
        let (_, adj_rows) = load_matrix(adjusted_path, converter)?;

        check_calendars(raw_path, &raw_rows, adjusted_path, &adj_rows)?;

        let snapshots = raw_rows
            .into_iter()
            .zip(adj_rows)
            .map(|((time, raw), (_, adj))| build_snapshot(time, &raw, &adj))
            .collect();
        Ok(Self {
            name: display_name(raw_path),
            codes,
            snapshots,
            cursor: 0,
        })
    }
}

impl PriceFeed for CsvTabularSource {
    fn read(&mut self) -> Result<bool, FeedError> {
        if self.cursor == self.snapshots.len() {
            return Ok(false);
        }
        self.cursor += 1;
        Ok(true)
    }

    fn snapshot(&self) -> &PriceSnapshot {
        &self.snapshots[self.cursor - 1]
    }

    fn asset_count(&self) -> usize {
        self.codes.len()
    }

    fn codes(&self) -> &[String] {
        &self.codes
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) -> Result<(), FeedError> {
        self.cursor = 0;
        Ok(())
    }

    fn clone_feed(&self) -> Box<dyn PriceFeed> {
        Box::new(self.clone())
    }
}

fn display_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

type MatrixRow = (Timestamp, Vec<f64>);

fn load_matrix(path: &Path, converter: TimeConverter) -> Result<(Vec<String>, Vec<MatrixRow>), FeedError> {
    let shown = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| FeedError::csv(&shown, e))?;
    let headers = reader.headers().map_err(|e| FeedError::csv(&shown, e))?;
    let codes: Vec<String> = headers.iter().skip(1).map(str::to_owned).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FeedError::csv(&shown, e))?;
        let time_cell = record.get(0).unwrap_or_default();
        let time = converter(time_cell).ok_or_else(|| FeedError::BadTimestamp {
            path: shown.clone(),
            value: time_cell.to_owned(),
        })?;
        let prices = (1..=codes.len())
            .map(|i| parse_price(path, time, record.get(i).unwrap_or_default()))
            .collect();
        rows.push((time, prices));
    }
    Ok((codes, rows))
}

// Unparseable cell degrades to the 0.0 sentinel, which validate() turns
// into an untradable asset for that row.
fn parse_price(path: &Path, time: Timestamp, cell: &str) -> f64 {
    let cell = cell.trim();
    match cell.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            log::warn!(
                "unparseable price {:?} at {} in {}, treating as missing",
                cell,
                time,
                path.display()
            );
            0.0
        }
    }
}

fn build_snapshot(time: Timestamp, raw: &[f64], adj: &[f64]) -> PriceSnapshot {
    let mut snap = PriceSnapshot::with_assets(raw.len());
    snap.time = time;
    for (i, (&r, &a)) in raw.iter().zip(adj).enumerate() {
        snap.raw.open[i] = r;
        snap.raw.high[i] = r;
        snap.raw.low[i] = r;
        snap.raw.close[i] = r;
        snap.adj.open[i] = a;
        snap.adj.high[i] = a;
        snap.adj.low[i] = a;
        snap.adj.close[i] = a;
        snap.volume[i] = DEEP_BOOK_VOLUME;
    }
    snap.validate();
    snap
}

fn check_calendars(
    raw_path: &Path,
    raw_rows: &[MatrixRow],
    adjusted_path: &Path,
    adj_rows: &[MatrixRow],
) -> Result<(), FeedError> {
    let mismatch = |raw_date: String, adjusted_date: String| FeedError::CalendarMismatch {
        raw_source: raw_path.display().to_string(),
        adjusted_source: adjusted_path.display().to_string(),
        raw_date,
        adjusted_date,
    };
    for i in 0..raw_rows.len().max(adj_rows.len()) {
        match (raw_rows.get(i), adj_rows.get(i)) {
            (Some((rt, _)), Some((at, _))) if rt != at => {
                return Err(mismatch(rt.to_string(), at.to_string()));
            }
            (Some((rt, _)), None) => {
                return Err(mismatch(rt.to_string(), "end of file".to_owned()));
            }
            (None, Some((at, _))) => {
                return Err(mismatch("end of file".to_owned(), at.to_string()));
            }
            _ => {}
        }
    }
    Ok(())
}
