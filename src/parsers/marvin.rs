//! Task-tracker exports: habit history (JSON) and scheduled tasks (CSV)

use chrono::{DateTime, Local, NaiveDate};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{parse_csv, parse_date, SourceParser};
use crate::types::{CheckinError, HabitCount, Result, TaskEntry};

/// Tracker day placeholder for tasks not scheduled yet
const UNASSIGNED_DAY: &str = "unassigned";

/// Calendar day of a tracker timestamp in the local timezone
fn local_date(ts_ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ts_ms).map(|ts| ts.with_timezone(&Local).date_naive())
}

fn default_positive() -> bool {
    true
}

/// Habit document as exported by the task tracker
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HabitDocument {
    #[serde(default)]
    id: String,
    title: String,
    #[serde(default = "default_positive")]
    is_positive: bool,
    #[serde(default)]
    target: f64,
    #[serde(default)]
    period: String,
    /// Flat `[timestamp_ms, count, timestamp_ms, count, ...]`
    #[serde(default)]
    history: Vec<f64>,
}

/// Parser for the habit history export
#[derive(Debug, Default, Clone, Copy)]
pub struct HabitHistoryParser;

impl HabitHistoryParser {
    pub const SOURCE: &'static str = "marvin_habits";
}

impl SourceParser for HabitHistoryParser {
    type Record = HabitCount;

    fn source_id(&self) -> &'static str {
        Self::SOURCE
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<HabitCount>> {
        let mut buf = data.to_vec();
        let docs: Vec<HabitDocument> = simd_json::from_slice(&mut buf)
            .map_err(|e| CheckinError::Parse(format!("{}: {}", Self::SOURCE, e)))?;

        let mut counts = Vec::new();
        for doc in docs {
            if doc.history.len() % 2 != 0 {
                warn!(habit = %doc.title, id = %doc.id, "odd-length history, dropping trailing value");
            }
            for pair in doc.history.chunks_exact(2) {
                let (ts_ms, count) = (pair[0], pair[1]);
                let Some(date) = local_date(ts_ms as i64) else {
                    warn!(habit = %doc.title, ts_ms, "skipping out-of-range timestamp");
                    continue;
                };
                counts.push(HabitCount {
                    date,
                    habit: doc.title.clone(),
                    count,
                    target: doc.target,
                    period: doc.period.clone(),
                    is_positive: doc.is_positive,
                });
            }
        }
        Ok(counts)
    }
}

#[derive(Deserialize)]
struct TaskRow {
    name: String,
    day: String,
    #[serde(default)]
    parent: String,
    #[serde(default)]
    category: String,
    /// Hours
    #[serde(default)]
    duration: Option<f64>,
}

/// Parser for the scheduled task export
#[derive(Debug, Default, Clone, Copy)]
pub struct TasksParser;

impl TasksParser {
    pub const SOURCE: &'static str = "marvin_tasks";
}

impl SourceParser for TasksParser {
    type Record = TaskEntry;

    fn source_id(&self) -> &'static str {
        Self::SOURCE
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<TaskEntry>> {
        let rows: Vec<TaskRow> = parse_csv(
            Self::SOURCE,
            data,
            &[&["name"], &["day"], &["parent"], &["duration"]],
        )?;

        let mut tasks = Vec::with_capacity(rows.len());
        let mut unscheduled = 0usize;
        for row in rows {
            if row.day.trim() == UNASSIGNED_DAY {
                unscheduled += 1;
                continue;
            }
            let Some(date) = parse_date(&row.day) else {
                warn!(source = Self::SOURCE, task = %row.name, day = %row.day, "skipping task with bad day");
                continue;
            };
            tasks.push(TaskEntry {
                date,
                name: row.name,
                parent: row.parent,
                category: row.category,
                hours: row.duration.filter(|h| h.is_finite()).unwrap_or(0.0),
            });
        }
        if unscheduled > 0 {
            debug!(unscheduled, "skipped unscheduled tasks");
        }
        Ok(tasks)
    }
}
