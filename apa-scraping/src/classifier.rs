use log::debug;

use crate::schema::{TeamRecord, TeamStatus};

/// Used only when no record carries a year at all, in which case nothing can match it.
pub const FALLBACK_YEAR: u16 = 2025;

/// The latest year mentioned by any season.
pub fn current_year(records: &[TeamRecord]) -> u16 {
    records
        .iter()
        .filter_map(|r| r.season.as_ref()?.year())
        .max()
        .unwrap_or(FALLBACK_YEAR)
}

/// Labels every record and splits them into `(current, past)`, keeping the input order.
/// A record is current when its season mentions the latest year.
pub fn classify(records: Vec<TeamRecord>) -> (Vec<TeamRecord>, Vec<TeamRecord>) {
    let has_year = records
        .iter()
        .any(|r| r.season.as_ref().and_then(|s| s.year()).is_some());
    let year = current_year(&records).to_string();
    debug!("Current season year: {year}");
    records
        .into_iter()
        .map(|mut record| {
            let current = has_year
                && record
                    .season
                    .as_ref()
                    .is_some_and(|s| s.as_str().contains(&year));
            record.status = Some(if current {
                TeamStatus::Current
            } else {
                TeamStatus::Past
            });
            record
        })
        .partition(|r| r.status == Some(TeamStatus::Current))
}
