//! Parsers turning raw store extracts into typed records

mod exist;
mod finances;
mod marvin;
mod sleep;

pub use exist::AttributesParser;
pub use finances::{AccountsParser, BudgetParser, TransactionsParser};
pub use marvin::{HabitHistoryParser, TasksParser};
pub use sleep::SleepLogParser;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::types::{CheckinError, Result};

/// Store source ids, in load order
pub const SOURCE_IDS: [&str; 7] = [
    TransactionsParser::SOURCE,
    AccountsParser::SOURCE,
    BudgetParser::SOURCE,
    AttributesParser::SOURCE,
    HabitHistoryParser::SOURCE,
    TasksParser::SOURCE,
    SleepLogParser::SOURCE,
];

/// Trait for parsing one source's extract payload
pub trait SourceParser: Send + Sync {
    type Record: Send;

    /// Store source id (e.g. "daily_finances")
    fn source_id(&self) -> &'static str;

    /// Parse a whole payload. Malformed rows are skipped with a warning; a
    /// payload missing a required column or document shape is a `Parse` error.
    fn parse(&self, data: &[u8]) -> Result<Vec<Self::Record>>;
}

/// Deserialize CSV rows into `R`, skipping rows that fail.
///
/// `required` lists one slot per needed column, each slot holding the
/// accepted header names for it.
pub(crate) fn parse_csv<R: DeserializeOwned>(
    source: &str,
    data: &[u8],
    required: &[&[&str]],
) -> Result<Vec<R>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader.headers()?.clone();

    for names in required {
        if !headers.iter().any(|h| names.contains(&h)) {
            return Err(CheckinError::Parse(format!(
                "{}: missing column '{}'",
                source, names[0]
            )));
        }
    }

    let mut rows = Vec::new();
    for (i, result) in reader.deserialize::<R>().enumerate() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => warn!(source, row = i + 1, error = %e, "skipping malformed row"),
        }
    }
    Ok(rows)
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse a date in ISO or US slash form
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Timestamps like "2024-01-05 00:00:00" keep only the date part
    let s = s.split([' ', 'T']).next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse a money amount, tolerating currency symbols and thousands separators
pub(crate) fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
