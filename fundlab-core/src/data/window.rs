//! Date windows and result normalization (filter, sort, limit).

use crate::domain::{Dataset, DateOrder};
use crate::error::DataError;
use chrono::NaiveDate;

/// Parse an ISO-8601 calendar date (`YYYY-MM-DD`).
pub fn parse_date(s: &str) -> Result<NaiveDate, DataError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| DataError::InvalidRequest(format!("invalid date '{s}': {e}")))
}

/// Inclusive `[start, end]` date window; `start = None` means unbounded below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Rejects `start > end`.
    pub fn new(start: Option<NaiveDate>, end: NaiveDate) -> Result<Self, DataError> {
        if let Some(start) = start {
            if start > end {
                return Err(DataError::InvalidRequest(format!(
                    "start date {start} is after end date {end}"
                )));
            }
        }
        Ok(Self { start, end })
    }

    /// Everything up to and including `end`.
    pub fn until(end: NaiveDate) -> Self {
        Self { start: None, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && date <= self.end
    }
}

/// Keep only records whose natural date falls inside `window`.
pub fn filter_window<T: Dataset>(records: Vec<T>, window: &DateWindow) -> Vec<T> {
    records
        .into_iter()
        .filter(|r| window.contains(r.date()))
        .collect()
}

/// Filter to `window`, sort in `T::ORDER`, then keep the first `limit`.
///
/// For descending datasets that is the `limit` most recent records, for
/// ascending ones the `limit` earliest. The sort is stable, so records sharing
/// a date keep their relative order.
pub fn normalize<T: Dataset>(records: Vec<T>, window: &DateWindow, limit: Option<usize>) -> Vec<T> {
    let mut records = filter_window(records, window);
    match T::ORDER {
        DateOrder::Ascending => records.sort_by_key(|r| r.date()),
        DateOrder::Descending => records.sort_by(|a, b| b.date().cmp(&a.date())),
    }
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    records
}
