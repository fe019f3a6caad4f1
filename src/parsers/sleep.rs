//! Weekly sleep log parser

use chrono::{NaiveTime, Timelike};
use serde::Deserialize;
use tracing::warn;

use super::{parse_csv, SourceParser};
use crate::types::{parse_clock, Result, SleepLogRow};

#[derive(Deserialize)]
struct SleepRow {
    week: u32,
    wakeup: String,
    bedtime: String,
    duration: String,
}

/// Duration as minutes, or as an `HH:MM` span
fn parse_duration_minutes(s: &str) -> Option<f64> {
    if let Ok(minutes) = s.trim().parse::<f64>() {
        return minutes.is_finite().then_some(minutes);
    }
    parse_clock(s).map(|t: NaiveTime| (t.num_seconds_from_midnight() as f64) / 60.0)
}

/// Parser for the manually kept weekly sleep averages
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepLogParser;

impl SleepLogParser {
    pub const SOURCE: &'static str = "sleep_log";
}

impl SourceParser for SleepLogParser {
    type Record = SleepLogRow;

    fn source_id(&self) -> &'static str {
        Self::SOURCE
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<SleepLogRow>> {
        let rows: Vec<SleepRow> = parse_csv(
            Self::SOURCE,
            data,
            &[&["week"], &["wakeup"], &["bedtime"], &["duration"]],
        )?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let wake = parse_clock(&row.wakeup);
                let bed = parse_clock(&row.bedtime);
                let duration = parse_duration_minutes(&row.duration);
                match (wake, bed, duration) {
                    (Some(wake), Some(bed), Some(duration_minutes)) => Some(SleepLogRow {
                        week_number: row.week,
                        wake,
                        bed,
                        duration_minutes,
                    }),
                    _ => {
                        warn!(source = Self::SOURCE, week = row.week, "skipping unreadable sleep row");
                        None
                    }
                }
            })
            .collect())
    }
}
