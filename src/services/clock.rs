//! Time-of-day averaging
//!
//! Clock times wrap at midnight, so their mean is taken on a 24-hour circle:
//! each time becomes an angle, the sine and cosine components are averaged,
//! and `atan2` of the means is mapped back to a time. Durations do not wrap
//! and use the ordinary arithmetic mean.

use std::f64::consts::TAU;

use chrono::{NaiveTime, Timelike};

use crate::types::{CheckinError, Result};

const SECONDS_PER_DAY: f64 = 86_400.0;

fn seconds_since_midnight(t: &NaiveTime) -> f64 {
    t.num_seconds_from_midnight() as f64 + t.nanosecond() as f64 / 1e9
}

fn to_angle(t: &NaiveTime) -> f64 {
    seconds_since_midnight(t) / SECONDS_PER_DAY * TAU
}

/// Build a clock time from whole seconds, wrapping into one day.
pub fn clock_from_seconds(seconds: i64) -> NaiveTime {
    let secs = seconds.rem_euclid(SECONDS_PER_DAY as i64) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or(NaiveTime::MIN)
}

/// Build a clock time from fractional hours (e.g. `22.5` → 22:30), wrapping into one day.
pub fn clock_from_hours(hours: f64) -> NaiveTime {
    clock_from_seconds((hours * 3600.0).round() as i64)
}

/// Circular mean of clock times, rounded to the nearest second.
///
/// ```
/// use chrono::NaiveTime;
/// use checkin::services::clock::average_time_of_day;
///
/// let late = NaiveTime::from_hms_opt(23, 45, 0).unwrap();
/// let early = NaiveTime::from_hms_opt(0, 15, 0).unwrap();
/// assert_eq!(average_time_of_day(&[late, early]).unwrap(), NaiveTime::MIN);
/// ```
pub fn average_time_of_day(times: &[NaiveTime]) -> Result<NaiveTime> {
    if times.is_empty() {
        return Err(CheckinError::EmptyInput(
            "cannot average an empty set of clock times".into(),
        ));
    }

    let n = times.len() as f64;
    let (sin_sum, cos_sum) = times.iter().map(to_angle).fold((0.0, 0.0), |(s, c), a| {
        (s + a.sin(), c + a.cos())
    });
    let angle = (sin_sum / n).atan2(cos_sum / n);
    let seconds = angle / TAU * SECONDS_PER_DAY;

    Ok(clock_from_seconds(seconds.round() as i64))
}

/// Arithmetic mean of durations given in minutes
pub fn average_duration_minutes(durations: &[f64]) -> Result<f64> {
    if durations.is_empty() {
        return Err(CheckinError::EmptyInput(
            "cannot average an empty set of durations".into(),
        ));
    }
    Ok(durations.iter().sum::<f64>() / durations.len() as f64)
}

/// Signed distance from `target` to `value` on the clock, in seconds, within (-12h, 12h].
/// Positive means `value` is later than `target`.
pub fn clock_offset_seconds(value: NaiveTime, target: NaiveTime) -> i64 {
    let half_day = SECONDS_PER_DAY as i64 / 2;
    let raw = value.num_seconds_from_midnight() as i64 - target.num_seconds_from_midnight() as i64;
    let wrapped = raw.rem_euclid(SECONDS_PER_DAY as i64);
    if wrapped > half_day {
        wrapped - SECONDS_PER_DAY as i64
    } else {
        wrapped
    }
}
