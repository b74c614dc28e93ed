use chrono::NaiveDate;
use minerva_core::Timestamp;

/// Converts one raw timestamp cell into a simulation timestamp.
/// `None` means the cell is unparseable.
pub type TimeConverter = fn(&str) -> Option<Timestamp>;

/// `20100202` style dates.
pub fn parse_compact_date(s: &str) -> Option<Timestamp> {
    NaiveDate::parse_from_str(s.trim(), "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `2010-02-02` style dates.
pub fn parse_delimited_date(s: &str) -> Option<Timestamp> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
