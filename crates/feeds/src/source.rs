use std::fmt::Debug;

use minerva_core::{CommonSnapshot, PriceSnapshot};

use crate::error::FeedError;

/// A stream of timestamped per-asset price rows.
///
/// Contract: `read` stages the next row (returning `false` once exhausted),
/// after which `snapshot` exposes it until the next `read`. Timestamps must
/// be non-decreasing across successive reads. `reset` rewinds the stream to
/// its initial state for a fresh run.
pub trait PriceFeed: Debug + Send {
    fn read(&mut self) -> Result<bool, FeedError>;

    /// The pending row staged by the last successful `read`.
    fn snapshot(&self) -> &PriceSnapshot;

    fn asset_count(&self) -> usize;

    /// Asset codes, indexed like the snapshot's per-asset vectors.
    fn codes(&self) -> &[String];

    fn name(&self) -> &str;

    fn reset(&mut self) -> Result<(), FeedError>;

    fn clone_feed(&self) -> Box<dyn PriceFeed>;
}

impl Clone for Box<dyn PriceFeed> {
    fn clone(&self) -> Self {
        self.clone_feed()
    }
}

/// A stream of timestamped named-value rows (indices, macro series).
/// Same lifecycle contract as [`PriceFeed`].
pub trait CommonFeed: Debug + Send {
    fn read(&mut self) -> Result<bool, FeedError>;

    fn snapshot(&self) -> &CommonSnapshot;

    fn name(&self) -> &str;

    fn reset(&mut self) -> Result<(), FeedError>;

    fn clone_feed(&self) -> Box<dyn CommonFeed>;
}

impl Clone for Box<dyn CommonFeed> {
    fn clone(&self) -> Self {
        self.clone_feed()
    }
}
