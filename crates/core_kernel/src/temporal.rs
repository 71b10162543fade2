//! Business-date ranges
//!
//! Accounting periods are expressed as calendar dates, not instants. A
//! `DateRange` is inclusive on both ends: a monthly period running from
//! the 1st to the 31st accepts entries dated on either boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must be before end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Periods overlap")]
    PeriodsOverlap,
}

/// An inclusive range of business dates with `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new date range
    ///
    /// # Errors
    ///
    /// Returns `TemporalError::InvalidPeriod` unless `start < end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, TemporalError> {
        if start >= end {
            return Err(TemporalError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Returns true if the date falls inside the range, boundaries included
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns true if the two ranges share at least one date
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of calendar days covered, boundaries included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Fails if the two ranges overlap
    pub fn ensure_disjoint(&self, other: &DateRange) -> Result<(), TemporalError> {
        if self.overlaps(other) {
            return Err(TemporalError::PeriodsOverlap);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert!(range.contains(date(2024, 1, 1)));
        assert!(range.contains(date(2024, 1, 31)));
        assert!(!range.contains(date(2024, 2, 1)));
        assert!(!range.contains(date(2023, 12, 31)));
        assert_eq!(range.days(), 31);
    }

    #[test]
    fn test_start_must_precede_end() {
        assert!(DateRange::new(date(2024, 1, 31), date(2024, 1, 1)).is_err());
        assert!(matches!(
            DateRange::new(date(2024, 1, 1), date(2024, 1, 1)),
            Err(TemporalError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn test_overlap() {
        let january = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        let february = DateRange::new(date(2024, 2, 1), date(2024, 2, 29)).unwrap();
        let q1 = DateRange::new(date(2024, 1, 1), date(2024, 3, 31)).unwrap();

        assert!(!january.overlaps(&february));
        assert!(january.overlaps(&q1));
        assert_eq!(january.ensure_disjoint(&q1), Err(TemporalError::PeriodsOverlap));
    }
}
