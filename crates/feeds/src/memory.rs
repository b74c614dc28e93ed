use minerva_core::PriceSnapshot;

use crate::error::FeedError;
use crate::source::PriceFeed;

/// Price feed over pre-built snapshots. The workhorse for tests and for
/// callers that assemble data themselves.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    name: String,
    codes: Vec<String>,
    snapshots: Vec<PriceSnapshot>,
    cursor: usize,
}

impl InMemorySource {
    pub fn new(
        name: impl Into<String>,
        codes: Vec<String>,
        snapshots: Vec<PriceSnapshot>,
    ) -> Self {
        let assets = codes.len();
        debug_assert!(
            snapshots.iter().all(|s| s.asset_count() == assets),
            "snapshot shape must match the code list"
        );
        Self {
            name: name.into(),
            codes,
            snapshots,
            cursor: 0,
        }
    }
}

impl PriceFeed for InMemorySource {
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snap(day: u32) -> PriceSnapshot {
        let mut s = PriceSnapshot::with_assets(1);
        s.time = NaiveDate::from_ymd_opt(2022, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        s
    }

    #[test]
    fn read_until_exhausted_then_reset() {
        let mut feed = InMemorySource::new("mem", vec!["A".into()], vec![snap(1), snap(2)]);

        assert!(feed.read().unwrap());
        assert!(feed.read().unwrap());
        assert!(!feed.read().unwrap());

        feed.reset().unwrap();
        assert!(feed.read().unwrap());
        assert_eq!(feed.snapshot().time, snap(1).time);
    }
}
