//! Shared identifiers and calendar helpers for bookkeeping records.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Numeric identifier assigned to stored records.
pub type RecordId = u64;

/// Exposes a stable identifier for records kept in the book.
pub trait Identifiable {
    fn id(&self) -> RecordId;
}

/// Returns one past the highest identifier in `records`, or 1 when empty.
pub fn next_id<T: Identifiable>(records: &[T]) -> RecordId {
    records
        .iter()
        .map(Identifiable::id)
        .max()
        .map_or(1, |max| max + 1)
}

/// The two record collections persisted by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Invoice,
    FxRate,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RecordKind::Invoice => "Invoice",
            RecordKind::FxRate => "FX rate",
        };
        f.write_str(label)
    }
}

/// Calendar month used as grouping key and FX lookup period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        let (year, month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("invalid month `{}` (use YYYY-MM)", value);
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        YearMonth::new(year, month).ok_or_else(invalid)
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for YearMonth {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row(RecordId);

    impl Identifiable for Row {
        fn id(&self) -> RecordId {
            self.0
        }
    }

    #[test]
    fn next_id_starts_at_one_and_skips_gaps() {
        assert_eq!(next_id::<Row>(&[]), 1);
        assert_eq!(next_id(&[Row(3), Row(7), Row(2)]), 8);
    }

    #[test]
    fn year_month_orders_and_prints_zero_padded() {
        let march = YearMonth::new(2024, 3).unwrap();
        let december = YearMonth::new(2023, 12).unwrap();
        assert!(december < march);
        assert_eq!(march.to_string(), "2024-03");
        assert_eq!("2024-03".parse::<YearMonth>().unwrap(), march);
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!(YearMonth::new(2024, 0).is_none());
    }

    #[test]
    fn year_month_bounds_cover_leap_february() {
        let feb = YearMonth::new(2024, 2).unwrap();
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29));
        let dec = YearMonth::new(2023, 12).unwrap();
        assert_eq!(dec.last_day(), NaiveDate::from_ymd_opt(2023, 12, 31));
    }
}
