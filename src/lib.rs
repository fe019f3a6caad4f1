//! Personal finance and habit check-in.
//!
//! Raw extracts (transactions, budget, balances, wellness attributes, habit
//! history, sleep log) are read from a versioned store, mapped to budget
//! categories, bucketed by week / month / quarter / year, and compared with
//! budget and habit targets.

pub mod cli;
pub mod config;
pub mod parsers;
pub mod services;
pub mod types;
