//! Wellness attribute export parser

use serde::Deserialize;
use tracing::warn;

use super::{parse_csv, parse_date, SourceParser};
use crate::services::clock::clock_from_hours;
use crate::types::{HabitObservation, HabitValue, Result};

/// Bedtime, stored as minutes after midday
const SLEEP_START: &str = "sleep_start";
/// Wake time, stored as minutes after midnight
const SLEEP_END: &str = "sleep_end";

#[derive(Deserialize)]
struct AttributeRow {
    date: String,
    attribute: String,
    value: f64,
}

/// Parser for daily `date,attribute,value` rows
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributesParser;

impl AttributesParser {
    pub const SOURCE: &'static str = "exist_data";

    fn to_value(attribute: &str, raw: f64) -> HabitValue {
        match attribute {
            SLEEP_START => HabitValue::Clock(clock_from_hours(raw / 60.0 + 12.0)),
            SLEEP_END => HabitValue::Clock(clock_from_hours(raw / 60.0)),
            _ => HabitValue::Quantity(raw),
        }
    }
}

impl SourceParser for AttributesParser {
    type Record = HabitObservation;

    fn source_id(&self) -> &'static str {
        Self::SOURCE
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<HabitObservation>> {
        let rows: Vec<AttributeRow> =
            parse_csv(Self::SOURCE, data, &[&["date"], &["attribute"], &["value"]])?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let Some(date) = parse_date(&row.date) else {
                    warn!(source = Self::SOURCE, date = %row.date, "skipping row with bad date");
                    return None;
                };
                Some(HabitObservation {
                    date,
                    value: Self::to_value(&row.attribute, row.value),
                    attribute: row.attribute,
                })
            })
            .collect())
    }
}
