use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One ex-rights/ex-dividend event for a single asset.
///
/// Holdings are measured on `record_date`; the resulting share and cash
/// adjustments land on `execute_date`. Ratios follow the per-10-shares
/// convention: `bonus_ratio` and `rights_ratio` are new shares granted per
/// 10 held, `dividend_per_10` is cash paid per 10 held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XrdRecord {
    pub record_date: NaiveDate,
    pub execute_date: NaiveDate,
    pub bonus_ratio: f64,
    pub rights_ratio: f64,
    pub dividend_per_10: f64,
}

impl XrdRecord {
    /// Whole shares granted for a position held on the record date.
    pub fn shares_for(&self, position: i64) -> i64 {
        (position as f64 / 10.0 * (self.bonus_ratio + self.rights_ratio)).floor() as i64
    }

    /// Cash dividend for a position held on the record date.
    pub fn cash_for(&self, position: i64) -> f64 {
        position as f64 / 10.0 * self.dividend_per_10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> XrdRecord {
        XrdRecord {
            record_date: NaiveDate::from_ymd_opt(2022, 5, 10).unwrap(),
            execute_date: NaiveDate::from_ymd_opt(2022, 5, 12).unwrap(),
            bonus_ratio: 2.0,
            rights_ratio: 1.0,
            dividend_per_10: 4.5,
        }
    }

    #[test]
    fn share_grant_rounds_down() {
        // 25 / 10 * 3 = 7.5 shares, truncated to 7.
        assert_eq!(record().shares_for(25), 7);
    }

    #[test]
    fn dividend_is_not_rounded() {
        assert_eq!(record().cash_for(25), 25.0 / 10.0 * 4.5);
    }
}
