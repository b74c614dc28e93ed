use minerva_core::{CommonWindow, PriceWindow, Timestamp};

use crate::error::FeedError;
use crate::source::{CommonFeed, PriceFeed};

/// Per-feed merge state. `NeedsRead` means the staged row (if any) was
/// consumed and the next one must be fetched before the next merge step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    NeedsRead,
    Ready,
    Exhausted,
}

/// Exhausted feeds sort after every real timestamp.
const TIME_SENTINEL: Timestamp = Timestamp::MAX;

/// K-way merge of independently-clocked price feeds into a single stream of
/// global ticks.
///
/// Each `advance` picks the minimum pending timestamp across feeds and
/// accepts every feed tied at it; the other feeds receive a placeholder so
/// all windows stay index-aligned at the global clock. Feeds must emit
/// non-decreasing timestamps.
#[derive(Debug, Clone, Default)]
pub struct PriceFeedSynchronizer {
    feeds: Vec<Box<dyn PriceFeed>>,
    windows: Vec<PriceWindow>,
    status: Vec<FeedStatus>,
    next_time: Vec<Timestamp>,
    tick_valid: Vec<bool>,
    time: Option<Timestamp>,
}

impl PriceFeedSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feed(&mut self, feed: Box<dyn PriceFeed>, window: usize) {
        self.windows
            .push(PriceWindow::new(feed.asset_count(), window));
        self.feeds.push(feed);
        self.status.push(FeedStatus::NeedsRead);
        self.next_time.push(TIME_SENTINEL);
        self.tick_valid.push(false);
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// The global clock: timestamp of the last accepted tick.
    pub fn time(&self) -> Option<Timestamp> {
        self.time
    }

    pub fn window(&self, feed: usize) -> &PriceWindow {
        &self.windows[feed]
    }

    pub fn windows(&self) -> &[PriceWindow] {
        &self.windows
    }

    /// Whether `feed` carried fresh data on the last tick (false means its
    /// window top is a placeholder).
    pub fn tick_valid(&self, feed: usize) -> bool {
        self.tick_valid[feed]
    }

    pub fn valid_flags(&self) -> &[bool] {
        &self.tick_valid
    }

    pub fn feed(&self, feed: usize) -> &dyn PriceFeed {
        self.feeds[feed].as_ref()
    }

    /// Merge one global tick. Returns false once every feed is exhausted
    /// (or no feed was added).
    pub fn advance(&mut self) -> Result<bool, FeedError> {
        for i in 0..self.feeds.len() {
            if self.status[i] == FeedStatus::NeedsRead {
                if self.feeds[i].read()? {
                    self.status[i] = FeedStatus::Ready;
                    self.next_time[i] = self.feeds[i].snapshot().time;
                } else {
                    self.status[i] = FeedStatus::Exhausted;
                    self.next_time[i] = TIME_SENTINEL;
                }
            }
        }

        let Some(&tick) = self.next_time.iter().min() else {
            return Ok(false);
        };
        if tick == TIME_SENTINEL {
            return Ok(false);
        }

        for i in 0..self.feeds.len() {
            if self.status[i] == FeedStatus::Ready && self.next_time[i] == tick {
                self.windows[i].push(self.feeds[i].snapshot().clone());
                self.tick_valid[i] = true;
                self.status[i] = FeedStatus::NeedsRead;
            } else {
                self.windows[i].push_placeholder(tick);
                self.tick_valid[i] = false;
            }
        }
        self.time = Some(tick);
        Ok(true)
    }

    /// Rewind every feed and window for a fresh run.
    pub fn reset(&mut self) -> Result<(), FeedError> {
        for i in 0..self.feeds.len() {
            self.feeds[i].reset()?;
            self.windows[i].clear();
            self.status[i] = FeedStatus::NeedsRead;
            self.next_time[i] = TIME_SENTINEL;
            self.tick_valid[i] = false;
        }
        self.time = None;
        Ok(())
    }
}

/// Same merge over common (non-price) feeds.
#[derive(Debug, Clone, Default)]
pub struct CommonFeedSynchronizer {
    feeds: Vec<Box<dyn CommonFeed>>,
    windows: Vec<CommonWindow>,
    status: Vec<FeedStatus>,
    next_time: Vec<Timestamp>,
    tick_valid: Vec<bool>,
    time: Option<Timestamp>,
}

impl CommonFeedSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feed(&mut self, feed: Box<dyn CommonFeed>, window: usize) {
        self.windows.push(CommonWindow::new(window));
        self.feeds.push(feed);
        self.status.push(FeedStatus::NeedsRead);
        self.next_time.push(TIME_SENTINEL);
        self.tick_valid.push(false);
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    pub fn time(&self) -> Option<Timestamp> {
        self.time
    }

    pub fn window(&self, feed: usize) -> &CommonWindow {
        &self.windows[feed]
    }

    pub fn windows(&self) -> &[CommonWindow] {
        &self.windows
    }

    pub fn tick_valid(&self, feed: usize) -> bool {
        self.tick_valid[feed]
    }

    pub fn advance(&mut self) -> Result<bool, FeedError> {
        for i in 0..self.feeds.len() {
            if self.status[i] == FeedStatus::NeedsRead {
                if self.feeds[i].read()? {
                    self.status[i] = FeedStatus::Ready;
                    self.next_time[i] = self.feeds[i].snapshot().time;
                } else {
                    self.status[i] = FeedStatus::Exhausted;
                    self.next_time[i] = TIME_SENTINEL;
                }
            }
        }

        let Some(&tick) = self.next_time.iter().min() else {
            return Ok(false);
        };
        if tick == TIME_SENTINEL {
            return Ok(false);
        }

        for i in 0..self.feeds.len() {
            if self.status[i] == FeedStatus::Ready && self.next_time[i] == tick {
                self.windows[i].push(self.feeds[i].snapshot().clone());
                self.tick_valid[i] = true;
                self.status[i] = FeedStatus::NeedsRead;
            } else {
                self.windows[i].push_placeholder(tick);
                self.tick_valid[i] = false;
            }
        }
        self.time = Some(tick);
        Ok(true)
    }

    pub fn reset(&mut self) -> Result<(), FeedError> {
        for i in 0..self.feeds.len() {
            self.feeds[i].reset()?;
            self.windows[i].clear();
            self.status[i] = FeedStatus::NeedsRead;
            self.next_time[i] = TIME_SENTINEL;
            self.tick_valid[i] = false;
        }
        self.time = None;
        Ok(())
    }
}
