use serde::{Deserialize, Serialize};

/// Commission schedule with separate long/short rates.
///
/// Charges are computed on absolute notional, so a sell's fee is positive
/// and always reduces cash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    pub long_rate: f64,
    pub short_rate: f64,
}

impl Commission {
    pub fn new(long_rate: f64, short_rate: f64) -> Self {
        Self {
            long_rate,
            short_rate,
        }
    }

    /// Same rate regardless of side.
    pub fn flat(rate: f64) -> Self {
        Self::new(rate, rate)
    }

    pub fn charge(&self, price: f64, volume: i64) -> f64 {
        let rate = if volume >= 0 {
            self.long_rate
        } else {
            self.short_rate
        };
        rate * volume.unsigned_abs() as f64 * price
    }
}

/// Tax schedule, identical shape to [`Commission`] but kept distinct so the
/// two components can be configured and reported independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tax {
    pub long_rate: f64,
    pub short_rate: f64,
}

impl Tax {
    pub fn new(long_rate: f64, short_rate: f64) -> Self {
        Self {
            long_rate,
            short_rate,
        }
    }

    pub fn flat(rate: f64) -> Self {
        Self::new(rate, rate)
    }

    pub fn charge(&self, price: f64, volume: i64) -> f64 {
        let rate = if volume >= 0 {
            self.long_rate
        } else {
            self.short_rate
        };
        rate * volume.unsigned_abs() as f64 * price
    }
}
