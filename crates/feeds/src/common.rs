use std::path::Path;

use minerva_core::CommonSnapshot;

use crate::error::FeedError;
use crate::source::CommonFeed;
use crate::time::TimeConverter;

/// Non-price feed over one CSV file: first column the timestamp, remaining
/// columns keyed by header name. Columns listed in `string_columns` are kept
/// as text; everything else parses as a number, degrading to NaN with a
/// warning when malformed.
#[derive(Debug, Clone)]
pub struct CsvCommonSource {
    name: String,
    snapshots: Vec<CommonSnapshot>,
    cursor: usize,
}

impl CsvCommonSource {
    pub fn new(
        path: impl AsRef<Path>,
        string_columns: &[&str],
        converter: TimeConverter,
    ) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let mut reader = csv::Reader::from_path(path).map_err(|e| FeedError::csv(&shown, e))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| FeedError::csv(&shown, e))?
            .iter()
            .map(str::to_owned)
            .collect();

        let mut snapshots = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| FeedError::csv(&shown, e))?;
            let time_cell = record.get(0).unwrap_or_default();
            let time = converter(time_cell).ok_or_else(|| FeedError::BadTimestamp {
                path: shown.clone(),
                value: time_cell.to_owned(),
            })?;

            let mut snap = CommonSnapshot::placeholder(time);
            for (header, cell) in headers.iter().zip(record.iter()).skip(1) {
                if string_columns.contains(&header.as_str()) {
                    snap.text.insert(header.clone(), cell.to_owned());
                } else {
                    let value = cell.trim().parse::<f64>().unwrap_or_else(|_| {
                        log::warn!(
                            "unparseable value {:?} for {} at {} in {}",
                            cell,
                            header,
                            time,
                            shown
                        );
                        f64::NAN
                    });
                    snap.num.insert(header.clone(), value);
                }
            }
            snapshots.push(snap);
        }

        Ok(Self {
            name: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(shown),
            snapshots,
            cursor: 0,
        })
    }
}

impl CommonFeed for CsvCommonSource {
    fn read(&mut self) -> Result<bool, FeedError> {
        if self.cursor == self.snapshots.len() {
            return Ok(false);
        }
        self.cursor += 1;
        Ok(true)
    }

    fn snapshot(&self) -> &CommonSnapshot {
        &self.snapshots[self.cursor - 1]
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn reset(&mut self) -> Result<(), FeedError> {
        self.cursor = 0;
        Ok(())
    }

    fn clone_feed(&self) -> Box<dyn CommonFeed> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_delimited_date;
    use std::io::Write;

    #[test]
    fn splits_columns_by_declared_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macro.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"date,index,regime\n2022-01-03,3000.5,bull\n2022-01-04,bad,bear\n")
            .unwrap();

        let mut feed = CsvCommonSource::new(&path, &["regime"], parse_delimited_date).unwrap();

        assert!(feed.read().unwrap());
        assert_eq!(feed.snapshot().num["index"], 3000.5);
        assert_eq!(feed.snapshot().text["regime"], "bull");

        assert!(feed.read().unwrap());
        assert!(feed.snapshot().num["index"].is_nan());
        assert!(!feed.read().unwrap());
    }
}
