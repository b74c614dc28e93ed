use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use minerva_core::{PriceSnapshot, Timestamp};

use crate::error::FeedError;
use crate::source::PriceFeed;
use crate::tabular::DEEP_BOOK_VOLUME;
use crate::time::TimeConverter;

/// Column map for per-asset OHLC files.
#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    pub time: usize,
    pub open: usize,
    pub high: usize,
    pub low: usize,
    pub close: usize,
    pub volume: Option<usize>,
    /// Extra numeric columns captured into snapshot side-channels, by name.
    pub extra_num: Vec<(String, usize)>,
    /// Extra string columns captured into snapshot side-channels, by name.
    pub extra_str: Vec<(String, usize)>,
}

impl Default for DirectoryLayout {
    fn default() -> Self {
        Self {
            time: 0,
            open: 1,
            high: 2,
            low: 3,
            close: 4,
            volume: None,
            extra_num: Vec::new(),
            extra_str: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct AssetRow {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
    extra_num: Vec<f64>,
    extra_str: Vec<String>,
}

/// Price feed over a directory of per-asset OHLC files, merged onto the
/// union of their calendars. An asset with no row at a merged timestamp is
/// invalid for that tick.
///
/// With an adjusted directory, each raw file's counterpart (same file name)
/// supplies the adjusted block; an asset whose counterpart is missing is
/// skipped with a warning, and a counterpart whose dates disagree with the
/// raw file is fatal.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    name: String,
    codes: Vec<String>,
    snapshots: Vec<PriceSnapshot>,
    cursor: usize,
}

impl CsvDirectorySource {
    pub fn new(
        dir: impl AsRef<Path>,
        layout: DirectoryLayout,
        converter: TimeConverter,
    ) -> Result<Self, FeedError> {
        Self::build(dir.as_ref(), None, layout, converter)
    }

    pub fn with_adjusted(
        dir: impl AsRef<Path>,
        adjusted_dir: impl AsRef<Path>,
        layout: DirectoryLayout,
        converter: TimeConverter,
    ) -> Result<Self, FeedError> {
        Self::build(dir.as_ref(), Some(adjusted_dir.as_ref()), layout, converter)
    }

    /// Rewrite asset codes, e.g. to strip an exchange suffix baked into the
    /// file names.
    pub fn map_codes(mut self, f: impl Fn(&str) -> String) -> Self {
        for code in &mut self.codes {
            *code = f(code);
        }
        self
    }

    fn build(
        dir: &Path,
        adjusted_dir: Option<&Path>,
        layout: DirectoryLayout,
        converter: TimeConverter,
    ) -> Result<Self, FeedError> {
        let mut codes = Vec::new();
        // code -> time -> (raw row, adjusted row)
        let mut by_asset: Vec<BTreeMap<Timestamp, (AssetRow, Option<AssetRow>)>> = Vec::new();

        for path in list_csv_files(dir)? {
            let code = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let adjusted = match adjusted_dir {
                Some(adj_dir) => {
                    let counterpart = adj_dir.join(path.file_name().unwrap_or_default());
                    if !counterpart.is_file() {
                        log::warn!(
                            "no adjusted counterpart for {}, skipping asset {}",
                            path.display(),
                            code
                        );
                        continue;
                    }
                    Some(load_asset_file(&counterpart, &layout, converter)?)
                }
                None => None,
            };

            let raw = load_asset_file(&path, &layout, converter)?;
            let merged = match adjusted {
                Some((adj_path, adj_rows)) => {
                    check_dates(&path, &raw.1, &adj_path, &adj_rows)?;
                    raw.1
                        .into_iter()
                        .zip(adj_rows)
                        .map(|((t, r), (_, a))| (t, (r, Some(a))))
                        .collect()
                }
                None => raw.1.into_iter().map(|(t, r)| (t, (r, None))).collect(),
            };

            codes.push(code);
            by_asset.push(merged);
        }

        let calendar: BTreeSet<Timestamp> = by_asset
            .iter()
            .flat_map(|rows| rows.keys().copied())
            .collect();

        let assets = codes.len();
        let mut snapshots = Vec::with_capacity(calendar.len());
        for time in calendar {
            let mut snap = PriceSnapshot::with_assets(assets);
            snap.time = time;
            for (name, _) in &layout.extra_num {
                snap.extra_num.insert(name.clone(), vec![f64::NAN; assets]);
            }
            for (name, _) in &layout.extra_str {
                snap.extra_str.insert(name.clone(), vec![String::new(); assets]);
            }
            for (i, rows) in by_asset.iter().enumerate() {
                let Some((raw, adj)) = rows.get(&time) else {
                    continue;
                };
                fill_asset(&mut snap, i, raw, adj.as_ref(), &layout);
            }
            snap.validate();
            snapshots.push(snap);
        }

        Ok(Self {
            name: dir
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string()),
            codes,
            snapshots,
            cursor: 0,
        })
    }
}

fn fill_asset(
    snap: &mut PriceSnapshot,
    asset: usize,
    raw: &AssetRow,
    adj: Option<&AssetRow>,
    layout: &DirectoryLayout,
) {
    snap.raw.open[asset] = raw.open;
    snap.raw.high[asset] = raw.high;
    snap.raw.low[asset] = raw.low;
    snap.raw.close[asset] = raw.close;
    let adj = adj.unwrap_or(raw);
    snap.adj.open[asset] = adj.open;
    snap.adj.high[asset] = adj.high;
    snap.adj.low[asset] = adj.low;
    snap.adj.close[asset] = adj.close;
    snap.volume[asset] = raw.volume;
    for ((name, _), value) in layout.extra_num.iter().zip(&raw.extra_num) {
        if let Some(series) = snap.extra_num.get_mut(name) {
            series[asset] = *value;
        }
    }
    for ((name, _), value) in layout.extra_str.iter().zip(&raw.extra_str) {
        if let Some(series) = snap.extra_str.get_mut(name) {
            series[asset] = value.clone();
        }
    }
}

impl PriceFeed for CsvDirectorySource {
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

fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>, FeedError> {
    let shown = dir.display().to_string();
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| FeedError::io(&shown, e))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| FeedError::io(&shown, e))?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    // Directory order is platform-dependent; asset indices must not be.
    files.sort();
    Ok(files)
}

type AssetSeries = (PathBuf, Vec<(Timestamp, AssetRow)>);

fn load_asset_file(
    path: &Path,
    layout: &DirectoryLayout,
    converter: TimeConverter,
) -> Result<AssetSeries, FeedError> {
    let shown = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| FeedError::csv(&shown, e))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FeedError::csv(&shown, e))?;
        let cell = |idx: usize, what: &str| -> Result<&str, FeedError> {
            record.get(idx).ok_or_else(|| FeedError::MissingColumn {
                path: shown.clone(),
                column: format!("{what} (index {idx})"),
            })
        };

        let time_cell = cell(layout.time, "time")?;
        let time = converter(time_cell).ok_or_else(|| FeedError::BadTimestamp {
            path: shown.clone(),
            value: time_cell.to_owned(),
        })?;

        let num = |raw: &str| parse_numeric(path, time, raw);
        let volume = match layout.volume {
            Some(idx) => num(cell(idx, "volume")?) as i64,
            None => DEEP_BOOK_VOLUME,
        };
        let extra_num = layout
            .extra_num
            .iter()
            .map(|(name, idx)| Ok(num(cell(*idx, name)?)))
            .collect::<Result<_, FeedError>>()?;
        let extra_str = layout
            .extra_str
            .iter()
            .map(|(name, idx)| Ok(cell(*idx, name)?.to_owned()))
            .collect::<Result<_, FeedError>>()?;

        rows.push((
            time,
            AssetRow {
                open: num(cell(layout.open, "open")?),
                high: num(cell(layout.high, "high")?),
                low: num(cell(layout.low, "low")?),
                close: num(cell(layout.close, "close")?),
                volume,
                extra_num,
                extra_str,
            },
        ));
    }
    Ok((path.to_path_buf(), rows))
}

// NaN sentinel: validate() rejects it, so a malformed bar is untradable
// without poisoning neighbouring assets.
fn parse_numeric(path: &Path, time: Timestamp, cell: &str) -> f64 {
    let cell = cell.trim();
    match cell.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            log::warn!(
                "unparseable value {:?} at {} in {}, treating as missing",
                cell,
                time,
                path.display()
            );
            f64::NAN
        }
    }
}

fn check_dates(
    raw_path: &Path,
    raw_rows: &[(Timestamp, AssetRow)],
    adjusted_path: &Path,
    adj_rows: &[(Timestamp, AssetRow)],
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
