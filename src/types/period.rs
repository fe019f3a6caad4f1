//! Time bucket types: granularity, bucket keys, and per-date period fields

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::CheckinError;

/// Bucket size used to group dated records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Week,
        Granularity::Month,
        Granularity::Quarter,
        Granularity::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        }
    }

    /// How many monthly budgets one bucket of this size spans.
    pub fn months_per_bucket(&self) -> f64 {
        match self {
            Granularity::Week => 12.0 / 52.0,
            Granularity::Month => 1.0,
            Granularity::Quarter => 3.0,
            Granularity::Year => 12.0,
        }
    }
}

impl FromStr for Granularity {
    type Err = CheckinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            "quarter" => Ok(Granularity::Quarter),
            "year" => Ok(Granularity::Year),
            _ => Err(CheckinError::InvalidGranularity(s.to_string())),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Grouping key for one bucket. Week buckets are keyed by ISO week-year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "granularity", rename_all = "lowercase")]
pub enum BucketKey {
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
    Quarter { year: i32, quarter: u32 },
    Year { year: i32 },
}

impl BucketKey {
    pub fn granularity(&self) -> Granularity {
        match self {
            BucketKey::Week { .. } => Granularity::Week,
            BucketKey::Month { .. } => Granularity::Month,
            BucketKey::Quarter { .. } => Granularity::Quarter,
            BucketKey::Year { .. } => Granularity::Year,
        }
    }

    /// Year the bucket is filed under (ISO week-year for weeks)
    pub fn year(&self) -> i32 {
        match *self {
            BucketKey::Week { year, .. }
            | BucketKey::Month { year, .. }
            | BucketKey::Quarter { year, .. }
            | BucketKey::Year { year } => year,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        PeriodFields::of(date).key(self.granularity()) == *self
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Week { year, week } => write!(f, "{}-W{:02}", year, week),
            BucketKey::Month { year, month } => write!(f, "{}-{:02}", year, month),
            BucketKey::Quarter { year, quarter } => write!(f, "{}-Q{}", year, quarter),
            BucketKey::Year { year } => write!(f, "{}", year),
        }
    }
}

/// Bucket membership of a single date at every granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodFields {
    /// ISO week-year; differs from `year` for the first/last days of a year
    pub iso_year: i32,
    pub week_number: u32,
    pub month: u32,
    /// ceil(month / 3)
    pub quarter: u32,
    pub year: i32,
}

impl PeriodFields {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        let month = date.month();
        Self {
            iso_year: iso.year(),
            week_number: iso.week(),
            month,
            quarter: (month + 2) / 3,
            year: date.year(),
        }
    }

    pub fn key(&self, granularity: Granularity) -> BucketKey {
        match granularity {
            Granularity::Week => BucketKey::Week {
                year: self.iso_year,
                week: self.week_number,
            },
            Granularity::Month => BucketKey::Month {
                year: self.year,
                month: self.month,
            },
            Granularity::Quarter => BucketKey::Quarter {
                year: self.year,
                quarter: self.quarter,
            },
            Granularity::Year => BucketKey::Year { year: self.year },
        }
    }
}

/// Anything carrying a calendar date
pub trait Dated {
    fn date(&self) -> NaiveDate;
}

/// A record paired with its bucket membership
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucketed<T> {
    pub record: T,
    pub period: PeriodFields,
}

impl<T: Dated> Dated for Bucketed<T> {
    fn date(&self) -> NaiveDate {
        self.record.date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========== Granularity tests ==========

    #[test]
    fn test_granularity_parse() {
        assert_eq!("week".parse::<Granularity>().unwrap(), Granularity::Week);
        assert_eq!(" Month ".parse::<Granularity>().unwrap(), Granularity::Month);
        assert_eq!("QUARTER".parse::<Granularity>().unwrap(), Granularity::Quarter);
        assert_eq!("year".parse::<Granularity>().unwrap(), Granularity::Year);
    }

    #[test]
    fn test_granularity_parse_invalid() {
        let err = "fortnight".parse::<Granularity>().unwrap_err();
        assert!(matches!(err, CheckinError::InvalidGranularity(ref s) if s == "fortnight"));
    }

    #[test]
    fn test_granularity_display_roundtrip() {
        for g in Granularity::ALL {
            assert_eq!(g.to_string().parse::<Granularity>().unwrap(), g);
        }
    }

    // ========== PeriodFields tests ==========

    #[test]
    fn test_quarter_is_ceil_month_over_three() {
        let expected = [1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4];
        for (i, q) in expected.iter().enumerate() {
            let fields = PeriodFields::of(date(2024, i as u32 + 1, 15));
            assert_eq!(fields.quarter, *q, "month {}", i + 1);
        }
    }

    #[test]
    fn test_week_key_uses_iso_week_year_at_december_boundary() {
        // 2024-12-30 is a Monday in ISO week 1 of 2025
        let fields = PeriodFields::of(date(2024, 12, 30));
        assert_eq!(fields.year, 2024);
        assert_eq!(fields.iso_year, 2025);
        assert_eq!(
            fields.key(Granularity::Week),
            BucketKey::Week { year: 2025, week: 1 }
        );
        // The calendar-year buckets still file it under 2024
        assert_eq!(fields.key(Granularity::Year), BucketKey::Year { year: 2024 });
    }

    #[test]
    fn test_week_key_uses_iso_week_year_at_january_boundary() {
        // 2021-01-01 is a Friday in ISO week 53 of 2020
        let fields = PeriodFields::of(date(2021, 1, 1));
        assert_eq!(
            fields.key(Granularity::Week),
            BucketKey::Week { year: 2020, week: 53 }
        );
        assert_eq!(
            fields.key(Granularity::Month),
            BucketKey::Month { year: 2021, month: 1 }
        );
    }

    #[test]
    fn test_bucket_key_display() {
        let f = PeriodFields::of(date(2024, 1, 17));
        assert_eq!(f.key(Granularity::Week).to_string(), "2024-W03");
        assert_eq!(f.key(Granularity::Month).to_string(), "2024-01");
        assert_eq!(f.key(Granularity::Quarter).to_string(), "2024-Q1");
        assert_eq!(f.key(Granularity::Year).to_string(), "2024");
    }

    #[test]
    fn test_bucket_key_contains() {
        let key = BucketKey::Quarter {
            year: 2024,
            quarter: 2,
        };
        assert!(key.contains(date(2024, 4, 1)));
        assert!(key.contains(date(2024, 6, 30)));
        assert!(!key.contains(date(2024, 7, 1)));
        assert!(!key.contains(date(2023, 5, 1)));
    }

    #[test]
    fn test_bucket_keys_order_chronologically() {
        let mut keys = vec![
            BucketKey::Month { year: 2024, month: 2 },
            BucketKey::Month { year: 2023, month: 12 },
            BucketKey::Month { year: 2024, month: 1 },
        ];
        keys.sort();
        assert_eq!(keys[0], BucketKey::Month { year: 2023, month: 12 });
        assert_eq!(keys[2], BucketKey::Month { year: 2024, month: 2 });
    }
}
