//! User configuration (`~/.checkin/config.json`)

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::services::category_mapper::CategoryTable;
use crate::types::{BudgetEntry, CheckinError, KeyHabit, Result};

/// Settings that shape every report. Every field has a default, so a partial
/// file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// `meta-category → category → [raw provider labels]`
    pub categories: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Monthly budget per category, used when the store has no budget extract
    pub budget: BTreeMap<String, f64>,
    pub profit_target: f64,
    pub historical_start_year: i32,
    /// Categories left out of historical spend averages
    pub excluded_categories: Vec<String>,
    pub income_categories: Vec<String>,
    pub key_habits: Vec<KeyHabit>,
    /// Months of average spend to hold as cash
    pub saving_months: f64,
    /// Expected monthly housing payment (negative). When set, budget rows use
    /// it for the housing budget and profit/loss counts it instead of the
    /// housing actually paid in the period.
    pub housing_payment: Option<f64>,
    /// Top-level task categories reported as a whole instead of per project
    pub aggregate_task_categories: Vec<String>,
    pub store_dir: Option<PathBuf>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            categories: BTreeMap::new(),
            budget: BTreeMap::new(),
            profit_target: 3000.0,
            historical_start_year: 2022,
            excluded_categories: vec!["bonus".to_string(), "investment".to_string()],
            income_categories: vec!["income".to_string()],
            key_habits: Vec::new(),
            saving_months: 8.0,
            housing_payment: None,
            aggregate_task_categories: Vec::new(),
            store_dir: None,
        }
    }
}

impl UserConfig {
    pub fn default_path() -> Result<PathBuf> {
        let base_dirs = BaseDirs::new()
            .ok_or_else(|| CheckinError::Config("Cannot determine home directory".into()))?;
        Ok(base_dirs.home_dir().join(".checkin").join("config.json"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields defaults; a missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        if !path.exists() {
            if explicit {
                return Err(CheckinError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON document
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| CheckinError::Config(format!("Invalid config: {}", e)))?;
        config.category_table()?;
        Ok(config)
    }

    /// Many-to-one category table; fails if a name sits under two parents.
    pub fn category_table(&self) -> Result<CategoryTable> {
        CategoryTable::from_nested(&self.categories)
    }

    pub fn budget_entries(&self) -> Vec<BudgetEntry> {
        self.budget
            .iter()
            .map(|(category, budget)| BudgetEntry {
                category: category.clone(),
                budget: *budget,
            })
            .collect()
    }

    /// Categories left out of historical spend: the excluded list plus income
    pub fn non_spend_categories(&self) -> Vec<String> {
        let mut out = self.excluded_categories.clone();
        for c in &self.income_categories {
            if !out.contains(c) {
                out.push(c.clone());
            }
        }
        out
    }
}
