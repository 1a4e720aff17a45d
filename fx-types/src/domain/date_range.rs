//! Inclusive calendar date ranges.

use chrono::{NaiveDate, Utc};
use std::fmt;

use crate::error::RateError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date in UTC; the valuation date for "current" rates.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// An inclusive `[start, end]` range of valuation dates, `start <= end`,
/// spanning at most [`DateRange::MAX_DAYS`] days.
///
/// Only constructed through [`DateRange::new`] and friends, so every value
/// holds at least one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Ten years of days, leap days included.
    pub const MAX_DAYS: i64 = 3660;

    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RateError> {
        if start > end {
            return Err(RateError::InvalidDateRange(format!(
                "start_date {} must not be after end_date {}",
                start, end
            )));
        }
        let days = (end - start).num_days() + 1;
        if days > Self::MAX_DAYS {
            return Err(RateError::InvalidDateRange(format!(
                "range of {} days exceeds the maximum of {}",
                days,
                Self::MAX_DAYS
            )));
        }
        Ok(Self { start, end })
    }

    /// Parses two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, RateError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Every date in the range, ascending.
    pub fn days(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..={}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, RateError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| {
        RateError::InvalidDateRange(format!(
            "Dates must be in YYYY-MM-DD format, got {:?}",
            raw
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_single_day_range() {
        let range = DateRange::parse("2025-01-01", "2025-01-01").unwrap();
        assert_eq!(range.days(), vec![d(2025, 1, 1)]);
    }

    #[test]
    fn test_multi_day_range_crosses_month() {
        let range = DateRange::parse("2025-01-30", "2025-02-02").unwrap();
        assert_eq!(
            range.days(),
            vec![d(2025, 1, 30), d(2025, 1, 31), d(2025, 2, 1), d(2025, 2, 2)]
        );
        assert!(range.contains(d(2025, 2, 1)));
        assert!(!range.contains(d(2025, 2, 3)));
    }

    #[test]
    fn test_start_after_end_rejected() {
        let err = DateRange::parse("2023-01-03", "2023-01-01").unwrap_err();
        assert!(matches!(err, RateError::InvalidDateRange(_)));
    }

    #[test]
    fn test_range_length_is_capped() {
        let start = d(2015, 1, 1);
        let widest = start + chrono::Days::new(DateRange::MAX_DAYS as u64 - 1);
        let range = DateRange::new(start, widest).unwrap();
        assert_eq!(range.days().len(), DateRange::MAX_DAYS as usize);

        let err = DateRange::new(start, widest.succ_opt().unwrap()).unwrap_err();
        assert!(matches!(err, RateError::InvalidDateRange(msg) if msg.contains("maximum")));

        assert!(DateRange::parse("0001-01-01", "9999-12-31").is_err());
    }

    #[test]
    fn test_malformed_date_rejected() {
        let err = DateRange::parse("2023-13-01", "2023-01-03").unwrap_err();
        assert!(matches!(err, RateError::InvalidDateRange(msg) if msg.contains("YYYY-MM-DD")));
        assert!(DateRange::parse("yesterday", "2023-01-03").is_err());
    }

    #[test]
    fn test_display() {
        let range = DateRange::parse("2025-01-01", "2025-01-02").unwrap();
        assert_eq!(range.to_string(), "2025-01-01..=2025-01-02");
    }
}
