//! Habit scorecards: key-habit hit rates, task-tracker progress, sleep averages

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use tracing::warn;

use crate::services::aggregator::{AggFn, Aggregator};
use crate::services::bucketer::{bucket_of, filter_to_bucket};
use crate::services::clock::{average_duration_minutes, average_time_of_day, clock_offset_seconds};
use crate::types::{
    CheckinError, Granularity, HabitCount, HabitDirection, HabitObservation, HabitProgress,
    HabitScore, HabitValue, KeyHabit, Result, SleepLogRow, SleepSummary, TaskDuration, TaskEntry,
};

/// Period value marking weekly task-tracker habits
const WEEKLY_PERIOD: &str = "week";

/// Task categories with this many hours or fewer are left out of the rollup
pub const MIN_TASK_HOURS: f64 = 2.0;

/// Whether `value` meets `habit`'s target. None when the kinds differ.
///
/// Clock values compare by signed offset on the 24-hour circle, so a 00:15
/// bedtime is later than a 22:30 target rather than earlier.
pub fn target_met(value: &HabitValue, habit: &KeyHabit) -> Option<bool> {
    let direction = habit.effective_direction();
    match (value, &habit.target) {
        (HabitValue::Quantity(v), HabitValue::Quantity(t)) => Some(match direction {
            HabitDirection::AtLeast => v >= t,
            HabitDirection::AtMost => v <= t,
        }),
        (HabitValue::Clock(v), HabitValue::Clock(t)) => {
            let offset = clock_offset_seconds(*v, *t);
            Some(match direction {
                HabitDirection::AtLeast => offset >= 0,
                HabitDirection::AtMost => offset <= 0,
            })
        }
        _ => None,
    }
}

fn average_value(values: &[HabitValue]) -> Option<HabitValue> {
    if values.is_empty() {
        return None;
    }
    if values.iter().all(HabitValue::is_clock) {
        let times: Vec<_> = values
            .iter()
            .filter_map(|v| match v {
                HabitValue::Clock(t) => Some(*t),
                HabitValue::Quantity(_) => None,
            })
            .collect();
        return average_time_of_day(&times).ok().map(HabitValue::Clock);
    }
    let quantities: Vec<f64> = values
        .iter()
        .filter_map(|v| match v {
            HabitValue::Quantity(q) => Some(*q),
            HabitValue::Clock(_) => None,
        })
        .collect();
    if quantities.is_empty() {
        return None;
    }
    Some(HabitValue::Quantity(
        quantities.iter().sum::<f64>() / quantities.len() as f64,
    ))
}

/// Score every key habit over the bucket containing `reference`.
///
/// Habits with no observations in the bucket still get a row with zero
/// observed days and no average.
pub fn score_key_habits(
    observations: &[HabitObservation],
    key_habits: &[KeyHabit],
    granularity: Granularity,
    reference: NaiveDate,
) -> Vec<HabitScore> {
    let in_bucket = filter_to_bucket(observations, granularity, reference);

    key_habits
        .iter()
        .map(|habit| {
            let mut flagged: Vec<(&HabitObservation, bool)> = Vec::new();
            for obs in in_bucket.iter().filter(|o| o.attribute == habit.attribute) {
                match target_met(&obs.value, habit) {
                    Some(met) => flagged.push((obs, met)),
                    None => warn!(
                        attribute = %habit.attribute,
                        date = %obs.date,
                        "observation kind does not match target, skipping"
                    ),
                }
            }

            let hit_rate = Aggregator::aggregate(
                &flagged,
                |(o, _)| o.attribute.clone(),
                |(_, met)| if *met { 1.0 } else { 0.0 },
                AggFn::Mean,
            )
            .remove(&habit.attribute)
            .unwrap_or(0.0);

            let values: Vec<HabitValue> = flagged.iter().map(|(o, _)| o.value).collect();

            HabitScore {
                attribute: habit.attribute.clone(),
                target: habit.target,
                direction: habit.effective_direction(),
                observed_days: flagged.len() as u32,
                achieved_days: flagged.iter().filter(|(_, met)| *met).count() as u32,
                hit_rate,
                average: average_value(&values),
            }
        })
        .collect()
}

/// Weekly task-tracker habits summed over the bucket containing `reference`.
///
/// The weekly target is multiplied by the number of distinct ISO weeks with
/// data, so a month of four weeks is held to four weeks of target.
pub fn habit_progress(
    counts: &[HabitCount],
    granularity: Granularity,
    reference: NaiveDate,
) -> Vec<HabitProgress> {
    let weekly: Vec<HabitCount> = counts
        .iter()
        .filter(|c| c.period == WEEKLY_PERIOD)
        .cloned()
        .collect();
    let in_bucket = filter_to_bucket(&weekly, granularity, reference);
    if in_bucket.is_empty() {
        return Vec::new();
    }

    let weeks = in_bucket
        .iter()
        .map(|c| bucket_of(c.date, Granularity::Week))
        .collect::<HashSet<_>>()
        .len() as u32;

    let totals = Aggregator::aggregate(&in_bucket, |c| c.habit.clone(), |c| c.count, AggFn::Sum);
    let targets = Aggregator::aggregate(&in_bucket, |c| c.habit.clone(), |c| c.target, AggFn::Mean);
    let positive: BTreeMap<&str, bool> = in_bucket
        .iter()
        .map(|c| (c.habit.as_str(), c.is_positive))
        .collect();

    totals
        .into_iter()
        .map(|(habit, value)| {
            let target = targets.get(&habit).copied().unwrap_or(0.0) * weeks as f64;
            let is_positive = positive.get(habit.as_str()).copied().unwrap_or(true);
            let met = if is_positive {
                value >= target
            } else {
                value <= target
            };
            HabitProgress {
                habit,
                value,
                target,
                weeks,
                is_positive,
                met,
            }
        })
        .collect()
}

/// Tracked task hours per rolled-up category in the bucket containing
/// `reference`, largest first. See [`TaskEntry::rollup_category`].
pub fn task_durations(
    tasks: &[TaskEntry],
    aggregate_categories: &[String],
    granularity: Granularity,
    reference: NaiveDate,
) -> Vec<TaskDuration> {
    let in_bucket = filter_to_bucket(tasks, granularity, reference);
    let totals = Aggregator::aggregate(
        &in_bucket,
        |t| t.rollup_category(aggregate_categories).to_string(),
        |t| t.hours,
        AggFn::Sum,
    );

    let mut durations: Vec<TaskDuration> = totals
        .into_iter()
        .filter(|(_, hours)| *hours > MIN_TASK_HOURS)
        .map(|(category, hours)| TaskDuration { category, hours })
        .collect();
    durations.sort_by(|a, b| b.hours.total_cmp(&a.hours));
    durations
}

/// Average wake time, bedtime, and duration over the given week numbers
/// (all rows when `week_numbers` is empty).
pub fn sleep_summary(rows: &[SleepLogRow], week_numbers: &[u32]) -> Result<SleepSummary> {
    let selected: Vec<&SleepLogRow> = rows
        .iter()
        .filter(|r| week_numbers.is_empty() || week_numbers.contains(&r.week_number))
        .collect();
    if selected.is_empty() {
        return Err(CheckinError::EmptyInput(format!(
            "no sleep log rows for weeks {:?}",
            week_numbers
        )));
    }

    let wakes: Vec<_> = selected.iter().map(|r| r.wake).collect();
    let beds: Vec<_> = selected.iter().map(|r| r.bed).collect();
    let durations: Vec<f64> = selected.iter().map(|r| r.duration_minutes).collect();

    Ok(SleepSummary {
        weeks: selected.len() as u32,
        wake: average_time_of_day(&wakes)?,
        bed: average_time_of_day(&beds)?,
        duration_minutes: average_duration_minutes(&durations)?,
    })
}
