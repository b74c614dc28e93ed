//! Minerva Feeds
//!
//! Market-data ingestion for the Minerva backtesting kernel: file-backed,
//! in-memory and synthetic price sources, auxiliary ("common") data sources,
//! and the synchronizers that merge many independently-clocked feeds into a
//! single non-decreasing stream of global ticks.

pub mod common;
pub mod directory;
pub mod error;
pub mod memory;
pub mod random;
pub mod source;
pub mod sync;
pub mod tabular;
pub mod time;

pub use common::CsvCommonSource;
pub use directory::{CsvDirectorySource, DirectoryLayout};
pub use error::FeedError;
pub use memory::InMemorySource;
pub use random::{BrownianMotion, GeometricBrownianMotion, RandomProcessSource, StochasticProcess};
pub use source::{CommonFeed, PriceFeed};
pub use sync::{CommonFeedSynchronizer, FeedStatus, PriceFeedSynchronizer};
pub use time::{parse_compact_date, parse_delimited_date, TimeConverter};
