use chrono::NaiveDate;
use std::fmt;

use crate::errors::{IndicatorError, Result};

/// Closed interval `[from, to]` handed to a single scrape request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `from > to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(IndicatorError::InvalidDateRange);
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(DateRange::new(d(2020, 2, 1), d(2020, 1, 1)).is_err());
        assert!(DateRange::new(d(2020, 1, 1), d(2020, 1, 1)).is_ok());
    }

    #[test]
    fn contains_is_inclusive() {
        let range = DateRange::new(d(2020, 1, 1), d(2020, 1, 31)).unwrap();
        assert!(range.contains(d(2020, 1, 1)));
        assert!(range.contains(d(2020, 1, 31)));
        assert!(!range.contains(d(2020, 2, 1)));
        assert_eq!(range.to_string(), "2020-01-01 to 2020-01-31");
    }
}
