//! Category mapping service
//!
//! Resolves provider category labels to canonical budget categories and
//! their meta-categories. Labels missing from the table are dropped from
//! every category-based aggregate; that is expected, not an error.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::types::{CheckinError, MappedTransaction, Result, Transaction};

/// Normalize a raw label for lookup: trimmed, lowercase.
///
/// # Examples
/// ```
/// use checkin::services::category_mapper::normalize_label;
///
/// assert_eq!(normalize_label("  Mortgage & Rent "), "mortgage & rent");
/// ```
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Two-level many-to-one table: raw name → category → meta-category
#[derive(Debug, Clone, Default)]
pub struct CategoryTable {
    raw_to_category: HashMap<String, String>,
    category_to_meta: HashMap<String, String>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the nested config shape `meta → category → [raw names]`.
    pub fn from_nested(nested: &BTreeMap<String, BTreeMap<String, Vec<String>>>) -> Result<Self> {
        let mut table = Self::new();
        for (meta, categories) in nested {
            for (category, raw_names) in categories {
                table.insert_category(meta, category)?;
                for raw in raw_names {
                    table.insert_raw(category, raw)?;
                }
            }
        }
        Ok(table)
    }

    /// Register `category` under `meta`. A category may only have one meta-category.
    pub fn insert_category(&mut self, meta: &str, category: &str) -> Result<()> {
        match self.category_to_meta.get(category) {
            Some(existing) if existing != meta => Err(CheckinError::Config(format!(
                "category '{}' is listed under both '{}' and '{}'",
                category, existing, meta
            ))),
            Some(_) => Ok(()),
            None => {
                self.category_to_meta
                    .insert(category.to_string(), meta.to_string());
                Ok(())
            }
        }
    }

    /// Map a raw label to `category`. A raw label may only resolve to one category.
    pub fn insert_raw(&mut self, category: &str, raw: &str) -> Result<()> {
        if !self.category_to_meta.contains_key(category) {
            return Err(CheckinError::Config(format!(
                "category '{}' has no meta-category",
                category
            )));
        }
        let key = normalize_label(raw);
        match self.raw_to_category.get(&key) {
            Some(existing) if existing != category => Err(CheckinError::Config(format!(
                "raw category '{}' maps to both '{}' and '{}'",
                raw, existing, category
            ))),
            Some(_) => Ok(()),
            None => {
                self.raw_to_category.insert(key, category.to_string());
                Ok(())
            }
        }
    }

    /// Resolve a raw label to `(category, meta_category)`
    pub fn resolve(&self, raw: &str) -> Option<(&str, &str)> {
        let category = self.raw_to_category.get(&normalize_label(raw))?;
        let meta = self.category_to_meta.get(category)?;
        Some((category.as_str(), meta.as_str()))
    }

    /// All canonical categories, sorted
    pub fn categories(&self) -> Vec<&str> {
        let mut cats: Vec<&str> = self.category_to_meta.keys().map(String::as_str).collect();
        cats.sort_unstable();
        cats
    }
}

/// Attach category and meta-category to every transaction whose raw label is
/// in the table. Unmatched transactions are left out of the result.
pub fn map_categories(records: &[Transaction], table: &CategoryTable) -> Vec<MappedTransaction> {
    let mut dropped = 0usize;
    let mapped: Vec<MappedTransaction> = records
        .iter()
        .filter_map(|txn| match table.resolve(&txn.raw_category) {
            Some((category, meta)) => Some(MappedTransaction {
                date: txn.date,
                raw_category: txn.raw_category.clone(),
                category: category.to_string(),
                meta_category: meta.to_string(),
                amount: txn.amount,
                account: txn.account.clone(),
            }),
            None => {
                dropped += 1;
                None
            }
        })
        .collect();

    if dropped > 0 {
        debug!(dropped, kept = mapped.len(), "dropped unmapped transactions");
    }
    mapped
}
