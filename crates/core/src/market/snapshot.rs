use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// One set of per-asset OHLC series plus simple returns.
///
/// All vectors are indexed by asset and have identical length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OhlcBlock {
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    /// Simple return vs the previous snapshot's close (0 when unknown).
    pub ret: Vec<f64>,
}

impl OhlcBlock {
    pub fn with_assets(assets: usize) -> Self {
        Self {
            open: vec![0.0; assets],
            high: vec![0.0; assets],
            low: vec![0.0; assets],
            close: vec![0.0; assets],
            ret: vec![0.0; assets],
        }
    }

    pub fn resize(&mut self, assets: usize) {
        self.open.resize(assets, 0.0);
        self.high.resize(assets, 0.0);
        self.low.resize(assets, 0.0);
        self.close.resize(assets, 0.0);
        self.ret.resize(assets, 0.0);
    }

    pub fn reset(&mut self) {
        for series in [
            &mut self.open,
            &mut self.high,
            &mut self.low,
            &mut self.close,
            &mut self.ret,
        ] {
            series.fill(0.0);
        }
    }
}

/// One timestamped market-data row across every asset of a feed.
///
/// `raw` carries as-traded prices, `adj` their corporate-action-adjusted
/// counterparts. The two blocks are parallel: same asset order, same length.
/// `valid[i]` is true only when all four raw OHLC values of asset `i` are
/// strictly positive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub time: Timestamp,
    pub raw: OhlcBlock,
    pub adj: OhlcBlock,
    pub volume: Vec<i64>,
    pub valid: Vec<bool>,

    /// Named per-asset numeric side-channels (extra feed columns).
    pub extra_num: HashMap<String, Vec<f64>>,
    /// Named per-asset string side-channels.
    pub extra_str: HashMap<String, Vec<String>>,
}

impl PriceSnapshot {
    pub fn with_assets(assets: usize) -> Self {
        Self {
            time: Timestamp::default(),
            raw: OhlcBlock::with_assets(assets),
            adj: OhlcBlock::with_assets(assets),
            volume: vec![0; assets],
            valid: vec![false; assets],
            extra_num: HashMap::new(),
            extra_str: HashMap::new(),
        }
    }

    /// "No update this tick" marker: identical shape to a real snapshot,
    /// every asset flagged invalid.
    pub fn placeholder(assets: usize, time: Timestamp) -> Self {
        let mut snap = Self::with_assets(assets);
        snap.time = time;
        snap
    }

    pub fn asset_count(&self) -> usize {
        self.volume.len()
    }

    pub fn resize(&mut self, assets: usize) {
        self.raw.resize(assets);
        self.adj.resize(assets);
        self.volume.resize(assets, 0);
        self.valid.resize(assets, false);
    }

    /// Recompute the validity bits: an asset is tradable at this snapshot
    /// only if all four raw OHLC values are strictly positive.
    pub fn validate(&mut self) {
        for i in 0..self.valid.len() {
            self.valid[i] = self.raw.open[i] > 0.0
                && self.raw.high[i] > 0.0
                && self.raw.low[i] > 0.0
                && self.raw.close[i] > 0.0;
        }
    }

    /// Per-bar prices of one asset, as fed to price evaluators.
    pub fn bar(&self, asset: usize) -> crate::entities::BarPrices {
        crate::entities::BarPrices {
            open: self.raw.open[asset],
            high: self.raw.high[asset],
            low: self.raw.low[asset],
            close: self.raw.close[asset],
        }
    }
}

/// One timestamped row of a non-price ("common") feed: a flat named-value
/// map rather than per-asset arrays. Used for market indices, macro series
/// and similar auxiliary data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommonSnapshot {
    pub time: Timestamp,
    pub num: HashMap<String, f64>,
    pub text: HashMap<String, String>,
}

impl CommonSnapshot {
    pub fn placeholder(time: Timestamp) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }
}
