//! Type definitions for checkin

mod error;
mod finance;
mod habit;
mod period;

pub use error::*;
pub use finance::*;
pub use habit::*;
pub use period::*;

/// Non-fatal problems met while loading optional sources
#[derive(Debug, Clone, PartialEq)]
pub enum LoadWarning {
    /// Optional source has no extract in the store
    MissingSource(String),
    /// Extract exists but could not be parsed
    Unreadable(String),
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadWarning::MissingSource(s) => write!(f, "no extract for optional source '{}'", s),
            LoadWarning::Unreadable(s) => write!(f, "unreadable extract: {}", s),
        }
    }
}
