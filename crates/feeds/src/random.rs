use std::fmt::Debug;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use minerva_core::{PriceSnapshot, Timestamp};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::error::FeedError;
use crate::source::PriceFeed;
use crate::tabular::DEEP_BOOK_VOLUME;

/// An Itô diffusion `dX = drift(X) dt + diffusion(X) dW`, discretized with
/// the Euler–Maruyama scheme.
pub trait StochasticProcess: Debug + Clone + Send + Sync + 'static {
    fn initial(&self) -> f64;
    fn drift(&self, x: f64) -> f64;
    fn diffusion(&self, x: f64) -> f64;
}

/// Arithmetic Brownian motion with constant drift and volatility.
#[derive(Debug, Clone, Copy)]
pub struct BrownianMotion {
    pub x0: f64,
    pub mu: f64,
    pub sigma: f64,
}

impl StochasticProcess for BrownianMotion {
    fn initial(&self) -> f64 {
        self.x0
    }

    fn drift(&self, _x: f64) -> f64 {
        self.mu
    }

    fn diffusion(&self, _x: f64) -> f64 {
        self.sigma
    }
}

/// Geometric Brownian motion: drift and volatility proportional to level.
#[derive(Debug, Clone, Copy)]
pub struct GeometricBrownianMotion {
    pub x0: f64,
    pub mu: f64,
    pub sigma: f64,
}

impl StochasticProcess for GeometricBrownianMotion {
    fn initial(&self) -> f64 {
        self.x0
    }

    fn drift(&self, x: f64) -> f64 {
        self.mu * x
    }

    fn diffusion(&self, x: f64) -> f64 {
        self.sigma * x
    }
}

/// Synthetic price feed: one simulated path per asset, day-spaced bars with
/// OHLC collapsed to the simulated level.
///
/// Paths are drawn in antithetic pairs (asset `2k+1` reuses asset `2k`'s
/// Wiener increments negated), which halves Monte-Carlo variance when the
/// feed backs repeated strategy evaluations. Generation is eager and keyed
/// by the seed, so clones and resets replay the identical series.
#[derive(Debug, Clone)]
pub struct RandomProcessSource<P: StochasticProcess> {
    process: P,
    seed: u64,
    name: String,
    codes: Vec<String>,
    snapshots: Vec<PriceSnapshot>,
    cursor: usize,
}

impl<P: StochasticProcess> RandomProcessSource<P> {
    const DT: f64 = 1.0;

    pub fn new(process: P, assets: usize, steps: usize, seed: u64) -> Self {
        let start = NaiveDate::from_ymd_opt(2000, 1, 3)
            .unwrap_or_default()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default();
        let snapshots = generate(&process, assets, steps, seed, start);
        Self {
            process,
            seed,
            name: format!("random-{seed}"),
            codes: (0..assets).map(|i| format!("sim{i}")).collect(),
            snapshots,
            cursor: 0,
        }
    }

    pub fn process(&self) -> &P {
        &self.process
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Dump the generated paths (close per asset) for offline inspection.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), FeedError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let mut writer = csv::Writer::from_path(path).map_err(|e| FeedError::csv(&shown, e))?;

        let mut header = vec!["date".to_owned()];
        header.extend(self.codes.iter().cloned());
        writer
            .write_record(&header)
            .map_err(|e| FeedError::csv(&shown, e))?;

        for snap in &self.snapshots {
            let mut row = vec![snap.time.format("%Y-%m-%d").to_string()];
            row.extend(snap.raw.close.iter().map(|v| v.to_string()));
            writer
                .write_record(&row)
                .map_err(|e| FeedError::csv(&shown, e))?;
        }
        writer.flush().map_err(|e| FeedError::io(&shown, e))?;
        Ok(())
    }
}

fn generate<P: StochasticProcess>(
    process: &P,
    assets: usize,
    steps: usize,
    seed: u64,
    start: Timestamp,
) -> Vec<PriceSnapshot> {
    let mut rng = StdRng::seed_from_u64(seed);
    let sqrt_dt = RandomProcessSource::<P>::DT.sqrt();

    let mut levels = vec![process.initial(); assets];
    let mut snapshots = Vec::with_capacity(steps);
    for step in 0..steps {
        let mut carried = 0.0;
        for (i, level) in levels.iter_mut().enumerate() {
            let z = if i % 2 == 0 {
                carried = rng.sample(StandardNormal);
                carried
            } else {
                -carried
            };
            *level += process.drift(*level) * RandomProcessSource::<P>::DT
                + process.diffusion(*level) * sqrt_dt * z;
        }

        let mut snap = PriceSnapshot::with_assets(assets);
        snap.time = start + Duration::days(step as i64);
        for (i, &level) in levels.iter().enumerate() {
            snap.raw.open[i] = level;
            snap.raw.high[i] = level;
            snap.raw.low[i] = level;
            snap.raw.close[i] = level;
            snap.volume[i] = DEEP_BOOK_VOLUME;
        }
        snap.adj = snap.raw.clone();
        snap.validate();
        snapshots.push(snap);
    }
    snapshots
}

impl<P: StochasticProcess> PriceFeed for RandomProcessSource<P> {
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
