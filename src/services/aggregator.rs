//! Aggregator service for bucket totals, summaries, and historical averages

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::services::bucketer::bucket_of;
use crate::types::{BucketKey, BucketSummary, Dated, Granularity, MappedTransaction};

/// Reduction applied within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFn {
    Sum,
    Mean,
}

impl AggFn {
    fn finish(&self, sum: f64, count: u64) -> f64 {
        match self {
            AggFn::Sum => sum,
            AggFn::Mean if count == 0 => 0.0,
            AggFn::Mean => sum / count as f64,
        }
    }
}

/// Aggregator for bucketed finance statistics
pub struct Aggregator;

impl Aggregator {
    /// Group `records` by `key`, reduce `measure` with `agg` (ordered by key)
    pub fn aggregate<T, K, FK, FM>(records: &[T], key: FK, measure: FM, agg: AggFn) -> BTreeMap<K, f64>
    where
        K: Ord,
        FK: Fn(&T) -> K,
        FM: Fn(&T) -> f64,
    {
        let mut groups: BTreeMap<K, (f64, u64)> = BTreeMap::new();
        for record in records {
            let slot = groups.entry(key(record)).or_insert((0.0, 0));
            slot.0 += measure(record);
            slot.1 += 1;
        }
        groups
            .into_iter()
            .map(|(k, (sum, count))| (k, agg.finish(sum, count)))
            .collect()
    }

    /// Sum of `measure` per bucket
    pub fn bucket_totals<T, FM>(
        records: &[T],
        granularity: Granularity,
        measure: FM,
    ) -> BTreeMap<BucketKey, f64>
    where
        T: Dated,
        FM: Fn(&T) -> f64,
    {
        Self::aggregate(
            records,
            |r| bucket_of(r.date(), granularity),
            measure,
            AggFn::Sum,
        )
    }

    /// Spend / income / profit / category breakdown for every bucket (sorted by bucket)
    pub fn summarize(records: &[MappedTransaction], granularity: Granularity) -> Vec<BucketSummary> {
        let mut buckets: BTreeMap<BucketKey, BucketSummary> = BTreeMap::new();
        for txn in records {
            let key = bucket_of(txn.date, granularity);
            buckets
                .entry(key)
                .or_insert_with(|| BucketSummary::empty(key))
                .add(txn);
        }
        buckets.into_values().collect()
    }

    /// Summary of the bucket containing `reference`; empty if it has no records
    pub fn summarize_bucket(
        records: &[MappedTransaction],
        granularity: Granularity,
        reference: NaiveDate,
    ) -> BucketSummary {
        let key = bucket_of(reference, granularity);
        let mut summary = BucketSummary::empty(key);
        for txn in records.iter().filter(|t| bucket_of(t.date, granularity) == key) {
            summary.add(txn);
        }
        summary
    }

    /// Mean monthly total since `since_year`, excluding `excluding` categories.
    /// See [`Aggregator::historical_average_by`].
    pub fn historical_average(
        records: &[MappedTransaction],
        since_year: i32,
        excluding: &[String],
    ) -> Option<f64> {
        Self::historical_average_by(records, Granularity::Month, since_year, excluding)
    }

    /// Mean bucket total over all buckets at or after `since_year`.
    ///
    /// Amounts are summed within each bucket first, then the bucket totals are
    /// averaged, so a month with many small transactions weighs the same as a
    /// month with one large one. Returns `None` when no bucket qualifies.
    pub fn historical_average_by(
        records: &[MappedTransaction],
        granularity: Granularity,
        since_year: i32,
        excluding: &[String],
    ) -> Option<f64> {
        let excluded: HashSet<&str> = excluding.iter().map(String::as_str).collect();
        let kept: Vec<&MappedTransaction> = records
            .iter()
            .filter(|t| !excluded.contains(t.category.as_str()))
            .collect();

        let totals = Self::aggregate(
            &kept,
            |t| bucket_of(t.date, granularity),
            |t| t.amount,
            AggFn::Sum,
        );

        let per_bucket: Vec<f64> = totals
            .into_iter()
            .filter(|(k, _)| k.year() >= since_year)
            .map(|(_, total)| total)
            .collect();

        if per_bucket.is_empty() {
            return None;
        }
        Some(per_bucket.iter().sum::<f64>() / per_bucket.len() as f64)
    }

    /// Mean per-bucket total of each category since `since_year`.
    ///
    /// A category is averaged over the buckets in which it appears.
    pub fn category_averages(
        records: &[MappedTransaction],
        granularity: Granularity,
        since_year: i32,
        excluding: &[String],
    ) -> BTreeMap<String, f64> {
        let kept: Vec<&MappedTransaction> = records
            .iter()
            .filter(|t| !excluding.contains(&t.category))
            .filter(|t| bucket_of(t.date, granularity).year() >= since_year)
            .collect();

        let bucket_category_totals = Self::aggregate(
            &kept,
            |t| (t.category.clone(), bucket_of(t.date, granularity)),
            |t| t.amount,
            AggFn::Sum,
        );

        let pairs: Vec<(String, f64)> = bucket_category_totals
            .into_iter()
            .map(|((category, _), total)| (category, total))
            .collect();

        Self::aggregate(&pairs, |(c, _)| c.clone(), |(_, v)| *v, AggFn::Mean)
    }

    /// Quantile `q` (0..=1) with linear interpolation between closest ranks.
    /// Returns `None` for an empty slice.
    pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
        let lo = rank.floor() as usize;
        let hi = rank.ceil() as usize;
        Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
    }

    /// Signed totals per meta-category
    pub fn meta_category_totals(records: &[MappedTransaction]) -> BTreeMap<String, f64> {
        Self::aggregate(
            records,
            |t| t.meta_category.clone(),
            |t| t.amount,
            AggFn::Sum,
        )
    }
}
