//! TradeDate type for calendar trading dates.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// Calendar trading date.
///
/// Wraps a `chrono::NaiveDate`. The simulation operates on one valuation
/// per calendar day, so dates (not timestamps) are the engine's clock.
///
/// # Examples
///
/// ```
/// use sirocco_core::types::TradeDate;
///
/// let date = TradeDate::from_ymd(2024, 1, 15).unwrap();
/// assert!(date.is_weekday());
/// assert_eq!(date.year(), 2024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct TradeDate(NaiveDate);

impl TradeDate {
    /// Creates a `TradeDate` from a `NaiveDate`.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Creates a `TradeDate` from year, month, and day.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidDate` if the components do not
    /// form a valid calendar date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, ValidationError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// Returns the underlying `NaiveDate`.
    #[must_use]
    pub const fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Returns the calendar year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the calendar month (1-12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Returns the weekday.
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    /// Returns true if the date falls Monday through Friday.
    #[must_use]
    pub fn is_weekday(&self) -> bool {
        !matches!(self.0.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Returns the date `days` calendar days later.
    #[must_use]
    pub fn add_days(&self, days: u64) -> Self {
        Self(self.0.checked_add_days(Days::new(days)).unwrap_or(self.0))
    }

    /// Returns the next calendar day.
    #[must_use]
    pub fn succ(&self) -> Self {
        self.add_days(1)
    }

    /// Returns the signed number of calendar days from `self` to `other`.
    ///
    /// Positive when `other` is in the future.
    #[must_use]
    pub fn days_until(&self, other: Self) -> i64 {
        other.0.signed_duration_since(self.0).num_days()
    }
}

impl fmt::Display for TradeDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for TradeDate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| ValidationError::InvalidDate(s.to_string()))
    }
}

impl From<NaiveDate> for TradeDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_ymd_valid() {
        let date = TradeDate::from_ymd(2024, 3, 15).unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 3);
    }

    #[test]
    fn test_date_from_ymd_invalid() {
        assert!(matches!(
            TradeDate::from_ymd(2024, 2, 30),
            Err(ValidationError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_date_weekday() {
        // 2024-01-15 is a Monday, 2024-01-13 a Saturday
        assert!(TradeDate::from_ymd(2024, 1, 15).unwrap().is_weekday());
        assert!(!TradeDate::from_ymd(2024, 1, 13).unwrap().is_weekday());
    }

    #[test]
    fn test_date_arithmetic() {
        let date = TradeDate::from_ymd(2024, 1, 1).unwrap();
        let later = date.add_days(45);
        assert_eq!(date.days_until(later), 45);
        assert_eq!(later.days_until(date), -45);
    }

    #[test]
    fn test_date_parse_display_roundtrip() {
        let date: TradeDate = "2024-06-21".parse().unwrap();
        assert_eq!(format!("{date}"), "2024-06-21");
    }

    #[test]
    fn test_date_serde_roundtrip() {
        let date = TradeDate::from_ymd(2024, 12, 20).unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2024-12-20\"");
        let parsed: TradeDate = serde_json::from_str(&json).unwrap();
        assert_eq!(date, parsed);
    }
}
