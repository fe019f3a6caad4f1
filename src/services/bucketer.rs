//! Period bucketing: week / month / quarter / year membership and filtering

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::types::{BucketKey, Bucketed, Dated, Granularity, PeriodFields, Result};

/// Bucket key of `date` at `granularity`
pub fn bucket_of(date: NaiveDate, granularity: Granularity) -> BucketKey {
    PeriodFields::of(date).key(granularity)
}

/// Pair every record with its week/month/quarter/year fields
pub fn assign_buckets<T: Dated + Clone>(records: &[T]) -> Vec<Bucketed<T>> {
    records
        .iter()
        .map(|r| Bucketed {
            record: r.clone(),
            period: PeriodFields::of(r.date()),
        })
        .collect()
}

/// Records in the same bucket as `reference`
pub fn filter_to_bucket<T: Dated + Clone>(
    records: &[T],
    granularity: Granularity,
    reference: NaiveDate,
) -> Vec<T> {
    let key = bucket_of(reference, granularity);
    records
        .iter()
        .filter(|r| bucket_of(r.date(), granularity) == key)
        .cloned()
        .collect()
}

/// String-keyed variant for presentation layers; rejects unknown granularities.
pub fn filter_to_bucket_named<T: Dated + Clone>(
    records: &[T],
    granularity: &str,
    reference: NaiveDate,
) -> Result<Vec<T>> {
    let granularity: Granularity = granularity.parse()?;
    Ok(filter_to_bucket(records, granularity, reference))
}

/// Group records by bucket, ordered by key
pub fn group_by_bucket<T: Dated>(
    records: &[T],
    granularity: Granularity,
) -> BTreeMap<BucketKey, Vec<&T>> {
    let mut groups: BTreeMap<BucketKey, Vec<&T>> = BTreeMap::new();
    for record in records {
        groups
            .entry(bucket_of(record.date(), granularity))
            .or_default()
            .push(record);
    }
    groups
}

/// First and last day of a bucket; `None` for a key outside chrono's range
pub fn bucket_bounds(key: BucketKey) -> Option<(NaiveDate, NaiveDate)> {
    let ymd = NaiveDate::from_ymd_opt;
    let (first, next) = match key {
        BucketKey::Week { year, week } => {
            let monday = NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)?;
            (monday, monday.checked_add_days(Days::new(7))?)
        }
        BucketKey::Month { year, month } if month == 12 => (ymd(year, 12, 1)?, ymd(year + 1, 1, 1)?),
        BucketKey::Month { year, month } => (ymd(year, month, 1)?, ymd(year, month + 1, 1)?),
        BucketKey::Quarter { year, quarter } => {
            let first_month = quarter.checked_sub(1)? * 3 + 1;
            let next = if quarter == 4 {
                ymd(year + 1, 1, 1)?
            } else {
                ymd(year, first_month + 3, 1)?
            };
            (ymd(year, first_month, 1)?, next)
        }
        BucketKey::Year { year } => (ymd(year, 1, 1)?, ymd(year + 1, 1, 1)?),
    };
    Some((first, next.pred_opt()?))
}

/// Distinct ISO week numbers touched by a bucket, ascending
pub fn iso_weeks_of(key: BucketKey) -> Vec<u32> {
    let Some((first, last)) = bucket_bounds(key) else {
        return Vec::new();
    };
    let weeks: BTreeSet<u32> = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| d.iso_week().week())
        .collect();
    weeks.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckinError, Transaction};

    fn txn(y: i32, m: u32, d: u32, amount: f64) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            raw_category: "Groceries".to_string(),
            amount,
            account: String::new(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ========== assign_buckets tests ==========

    #[test]
    fn test_assign_buckets_fields() {
        let bucketed = assign_buckets(&[txn(2024, 5, 17, -10.0)]);
        assert_eq!(bucketed.len(), 1);
        let p = bucketed[0].period;
        assert_eq!(p.year, 2024);
        assert_eq!(p.month, 5);
        assert_eq!(p.quarter, 2);
        assert_eq!(p.week_number, 20);
        assert_eq!(bucketed[0].date(), date(2024, 5, 17));
    }

    #[test]
    fn test_assign_buckets_empty() {
        let bucketed: Vec<Bucketed<Transaction>> = assign_buckets(&[]);
        assert!(bucketed.is_empty());
    }

    // ========== filter_to_bucket tests ==========

    #[test]
    fn test_filter_month() {
        let records = vec![
            txn(2024, 1, 31, -1.0),
            txn(2024, 2, 1, -2.0),
            txn(2024, 2, 29, -3.0),
            txn(2023, 2, 15, -4.0),
        ];
        let result = filter_to_bucket(&records, Granularity::Month, date(2024, 2, 10));
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|t| t.date.format("%Y-%m").to_string() == "2024-02"));
    }

    #[test]
    fn test_filter_quarter() {
        let records = vec![
            txn(2024, 3, 31, -1.0),
            txn(2024, 4, 1, -2.0),
            txn(2024, 6, 30, -3.0),
            txn(2024, 7, 1, -4.0),
        ];
        let result = filter_to_bucket(&records, Granularity::Quarter, date(2024, 5, 5));
        let amounts: Vec<f64> = result.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![-2.0, -3.0]);
    }

    #[test]
    fn test_filter_year() {
        let records = vec![txn(2023, 12, 31, -1.0), txn(2024, 1, 1, -2.0)];
        let result = filter_to_bucket(&records, Granularity::Year, date(2024, 8, 1));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].amount, -2.0);
    }

    #[test]
    fn test_filter_week_spanning_year_boundary_uses_iso_week_year() {
        // ISO week 2025-W01 runs Mon 2024-12-30 .. Sun 2025-01-05
        let records = vec![
            txn(2024, 12, 29, -1.0), // Sunday, 2024-W52
            txn(2024, 12, 30, -2.0),
            txn(2024, 12, 31, -3.0),
            txn(2025, 1, 1, -4.0),
            txn(2025, 1, 5, -5.0),
            txn(2025, 1, 6, -6.0), // 2025-W02
        ];

        let from_december = filter_to_bucket(&records, Granularity::Week, date(2024, 12, 31));
        let from_january = filter_to_bucket(&records, Granularity::Week, date(2025, 1, 2));

        let amounts: Vec<f64> = from_december.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![-2.0, -3.0, -4.0, -5.0]);
        assert_eq!(from_december, from_january);
    }

    #[test]
    fn test_filter_week_ignores_same_week_number_in_other_year() {
        let records = vec![txn(2023, 3, 8, -1.0), txn(2024, 3, 6, -2.0)];
        // Both are ISO week 10, in different week-years
        let result = filter_to_bucket(&records, Granularity::Week, date(2024, 3, 7));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].amount, -2.0);
    }

    #[test]
    fn test_filter_named_rejects_unknown_granularity() {
        let records = vec![txn(2024, 1, 1, -1.0)];
        let err = filter_to_bucket_named(&records, "decade", date(2024, 1, 1)).unwrap_err();
        assert!(matches!(err, CheckinError::InvalidGranularity(ref g) if g == "decade"));
    }

    #[test]
    fn test_filter_named_accepts_known_granularity() {
        let records = vec![txn(2024, 1, 1, -1.0)];
        let result = filter_to_bucket_named(&records, "year", date(2024, 6, 1)).unwrap();
        assert_eq!(result.len(), 1);
    }

    // ========== group_by_bucket tests ==========

    #[test]
    fn test_group_by_bucket_sorted_and_exclusive() {
        let records = vec![
            txn(2024, 3, 1, -1.0),
            txn(2024, 1, 5, -2.0),
            txn(2024, 3, 20, -3.0),
        ];
        let groups = group_by_bucket(&records, Granularity::Month);
        let keys: Vec<String> = groups.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2024-01", "2024-03"]);
        let total: usize = groups.values().map(Vec::len).sum();
        assert_eq!(total, records.len());
    }

    // ========== bucket_bounds / iso_weeks_of tests ==========

    #[test]
    fn test_bucket_bounds() {
        assert_eq!(
            bucket_bounds(bucket_of(date(2024, 2, 10), Granularity::Month)),
            Some((date(2024, 2, 1), date(2024, 2, 29)))
        );
        assert_eq!(
            bucket_bounds(bucket_of(date(2024, 11, 3), Granularity::Quarter)),
            Some((date(2024, 10, 1), date(2024, 12, 31)))
        );
        assert_eq!(
            bucket_bounds(bucket_of(date(2025, 1, 2), Granularity::Week)),
            Some((date(2024, 12, 30), date(2025, 1, 5)))
        );
    }

    #[test]
    fn test_iso_weeks_of_month() {
        // March 2024 starts on a Friday (W09) and ends on a Sunday (W13)
        let weeks = iso_weeks_of(bucket_of(date(2024, 3, 15), Granularity::Month));
        assert_eq!(weeks, vec![9, 10, 11, 12, 13]);
    }

    #[test]
    fn test_iso_weeks_of_week() {
        assert_eq!(iso_weeks_of(bucket_of(date(2024, 3, 6), Granularity::Week)), vec![10]);
    }
}
