use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive span of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(rename = "earliest")]
    pub start: NaiveDate,
    #[serde(rename = "latest")]
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} al {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Smallest range covering every date, or `None` for an empty iterator.
    pub fn spanning<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Option<Self> {
        dates.into_iter().fold(None, |range, date| match range {
            None => Some(DateRange::new(date, date)),
            Some(r) => Some(DateRange::new(r.start.min(date), r.end.max(date))),
        })
    }

    pub fn days(self) -> i64 {
        (self.end - self.start).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn date_range_display() {
        let range = DateRange::new(d(2025, 1, 1), d(2025, 12, 31));
        assert_eq!(range.to_string(), "2025-01-01 al 2025-12-31");
    }

    #[test]
    fn spanning_finds_min_and_max() {
        let range = DateRange::spanning([d(2025, 3, 4), d(2025, 1, 9), d(2025, 2, 1)]).unwrap();
        assert_eq!(range.start, d(2025, 1, 9));
        assert_eq!(range.end, d(2025, 3, 4));
        assert_eq!(range.days(), 54);
    }

    #[test]
    fn spanning_empty_is_none() {
        assert!(DateRange::spanning(Vec::<NaiveDate>::new()).is_none());
    }

    #[test]
    fn serializes_as_earliest_latest() {
        let range = DateRange::new(d(2025, 1, 1), d(2025, 1, 31));
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, r#"{"earliest":"2025-01-01","latest":"2025-01-31"}"#);
    }
}
