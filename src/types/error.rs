use thiserror::Error;

/// checkin error types
#[derive(Error, Debug)]
pub enum CheckinError {
    /// Granularity string is not one of the supported bucket sizes
    #[error("invalid granularity '{0}': expected one of week, month, quarter, year")]
    InvalidGranularity(String),

    /// No dated extract exists for the requested source prefix
    #[error("no data available for source '{0}'")]
    NoDataAvailable(String),

    /// Operation is undefined on an empty input
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Failed to parse an extract
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer error
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Extract store operation failed
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for checkin
pub type Result<T> = std::result::Result<T, CheckinError>;

/// Replace NaN and infinities with zero so downstream tables stay renderable.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
