//! Habit and wellness attribute types

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize, Serializer};

use super::Dated;

/// Accepted clock formats, tried in order
const CLOCK_FORMATS: [&str; 4] = ["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];

/// Parse a clock string such as "22:30", "06:15:00" or "10:30 PM".
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    CLOCK_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Value of a wellness attribute: a plain quantity or a time of day
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawHabitValue")]
pub enum HabitValue {
    Quantity(f64),
    Clock(NaiveTime),
}

impl HabitValue {
    pub fn is_clock(&self) -> bool {
        matches!(self, HabitValue::Clock(_))
    }
}

impl fmt::Display for HabitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HabitValue::Quantity(v) if v.fract() == 0.0 => write!(f, "{:.0}", v),
            HabitValue::Quantity(v) => write!(f, "{:.2}", v),
            HabitValue::Clock(t) => write!(f, "{}", t.format("%H:%M")),
        }
    }
}

impl Serialize for HabitValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HabitValue::Quantity(v) => serializer.serialize_f64(*v),
            HabitValue::Clock(t) => serializer.collect_str(&t.format("%H:%M:%S")),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHabitValue {
    Number(f64),
    Text(String),
}

impl TryFrom<RawHabitValue> for HabitValue {
    type Error = String;

    fn try_from(raw: RawHabitValue) -> Result<Self, Self::Error> {
        match raw {
            RawHabitValue::Number(v) => Ok(HabitValue::Quantity(v)),
            RawHabitValue::Text(s) => {
                if let Some(t) = parse_clock(&s) {
                    Ok(HabitValue::Clock(t))
                } else {
                    s.trim()
                        .parse::<f64>()
                        .map(HabitValue::Quantity)
                        .map_err(|_| format!("'{}' is neither a number nor a clock time", s))
                }
            }
        }
    }
}

/// Which side of the target counts as success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitDirection {
    AtLeast,
    AtMost,
}

/// A tracked attribute with its success target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyHabit {
    pub attribute: String,
    pub target: HabitValue,
    #[serde(default)]
    pub direction: Option<HabitDirection>,
}

impl KeyHabit {
    /// Quantities default to "at least", clock targets to "no later than".
    pub fn effective_direction(&self) -> HabitDirection {
        self.direction.unwrap_or(match self.target {
            HabitValue::Quantity(_) => HabitDirection::AtLeast,
            HabitValue::Clock(_) => HabitDirection::AtMost,
        })
    }
}

/// One daily observation from the wellness-attribute source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitObservation {
    pub date: NaiveDate,
    pub attribute: String,
    pub value: HabitValue,
}

impl Dated for HabitObservation {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// One day of a task-tracker habit history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitCount {
    pub date: NaiveDate,
    pub habit: String,
    pub count: f64,
    /// Target per `period`
    pub target: f64,
    pub period: String,
    pub is_positive: bool,
}

impl Dated for HabitCount {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// One row of the manually maintained weekly sleep log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepLogRow {
    pub week_number: u32,
    pub wake: NaiveTime,
    pub bed: NaiveTime,
    pub duration_minutes: f64,
}

/// One scheduled task from the task tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub date: NaiveDate,
    pub name: String,
    /// Project path, nearest parent first (`"Reports/Client A/Work"`)
    pub parent: String,
    /// Top-level category the project sits under
    pub category: String,
    /// Tracked time, 0 when the task was never timed
    pub hours: f64,
}

impl TaskEntry {
    /// Category the task's time is reported under: the top-level category
    /// when it is listed in `aggregate`, otherwise the nearest parent project.
    pub fn rollup_category(&self, aggregate: &[String]) -> &str {
        if aggregate.contains(&self.category) {
            return &self.category;
        }
        self.parent
            .split('/')
            .map(str::trim)
            .find(|p| !p.is_empty())
            .unwrap_or(self.category.as_str())
    }
}

impl Dated for TaskEntry {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Tracked hours of one rolled-up task category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDuration {
    pub category: String,
    pub hours: f64,
}

/// Key habit outcome within one bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitScore {
    pub attribute: String,
    pub target: HabitValue,
    pub direction: HabitDirection,
    pub observed_days: u32,
    pub achieved_days: u32,
    /// Mean of the per-day achieved flags
    pub hit_rate: f64,
    /// None when the attribute has no observations in the bucket
    pub average: Option<HabitValue>,
}

/// Task-tracker habit total within one bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitProgress {
    pub habit: String,
    pub value: f64,
    /// Weekly target scaled by the number of weeks covered
    pub target: f64,
    pub weeks: u32,
    pub is_positive: bool,
    pub met: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepSummary {
    pub weeks: u32,
    pub wake: NaiveTime,
    pub bed: NaiveTime,
    pub duration_minutes: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clock_formats() {
        let expected = NaiveTime::from_hms_opt(22, 30, 0).unwrap();
        assert_eq!(parse_clock("22:30"), Some(expected));
        assert_eq!(parse_clock("22:30:00"), Some(expected));
        assert_eq!(parse_clock("10:30 PM"), Some(expected));
        assert_eq!(parse_clock(" 22:30 "), Some(expected));
        assert_eq!(parse_clock("late"), None);
    }

    #[test]
    fn test_key_habit_deserialize_number_target() {
        let habit: KeyHabit =
            serde_json::from_str(r#"{"attribute": "steps", "target": 4000}"#).unwrap();
        assert_eq!(habit.target, HabitValue::Quantity(4000.0));
        assert_eq!(habit.effective_direction(), HabitDirection::AtLeast);
    }

    #[test]
    fn test_key_habit_deserialize_clock_target() {
        let habit: KeyHabit =
            serde_json::from_str(r#"{"attribute": "sleep_start", "target": "22:30"}"#).unwrap();
        assert_eq!(
            habit.target,
            HabitValue::Clock(NaiveTime::from_hms_opt(22, 30, 0).unwrap())
        );
        assert_eq!(habit.effective_direction(), HabitDirection::AtMost);
    }

    #[test]
    fn test_key_habit_explicit_direction() {
        let habit: KeyHabit = serde_json::from_str(
            r#"{"attribute": "screen_time", "target": 120, "direction": "at_most"}"#,
        )
        .unwrap();
        assert_eq!(habit.effective_direction(), HabitDirection::AtMost);
    }

    #[test]
    fn test_habit_value_rejects_garbage() {
        let result: Result<HabitValue, _> = serde_json::from_str(r#""soon""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_habit_value_serialize() {
        let clock = HabitValue::Clock(NaiveTime::from_hms_opt(6, 5, 0).unwrap());
        assert_eq!(serde_json::to_string(&clock).unwrap(), "\"06:05:00\"");
        assert_eq!(
            serde_json::to_string(&HabitValue::Quantity(1.5)).unwrap(),
            "1.5"
        );
    }

    #[test]
    fn test_task_rollup_category() {
        let task = TaskEntry {
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            name: "Write report".into(),
            parent: "Reports/Client A/Work".into(),
            category: "Work".into(),
            hours: 1.0,
        };
        assert_eq!(task.rollup_category(&[]), "Reports");
        assert_eq!(task.rollup_category(&["Work".to_string()]), "Work");

        let loose = TaskEntry {
            parent: String::new(),
            ..task
        };
        assert_eq!(loose.rollup_category(&[]), "Work");
    }

    #[test]
    fn test_habit_value_display() {
        assert_eq!(HabitValue::Quantity(4000.0).to_string(), "4000");
        assert_eq!(HabitValue::Quantity(6.456).to_string(), "6.46");
        let clock = HabitValue::Clock(NaiveTime::from_hms_opt(23, 5, 40).unwrap());
        assert_eq!(clock.to_string(), "23:05");
    }
}
