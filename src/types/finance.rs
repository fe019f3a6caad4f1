//! Finance types: transactions, budgets, balances, and bucket summaries

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BucketKey, Dated};

/// A single ingested transaction. Amount is signed: negative = spend, positive = income.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    /// Provider-supplied category label, before mapping
    pub raw_category: String,
    pub amount: f64,
    /// Account tag the provider attached (e.g. "checking", "credit")
    #[serde(default)]
    pub account: String,
}

impl Dated for Transaction {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// A transaction resolved to a canonical budget category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedTransaction {
    pub date: NaiveDate,
    pub raw_category: String,
    pub category: String,
    pub meta_category: String,
    pub amount: f64,
    #[serde(default)]
    pub account: String,
}

impl Dated for MappedTransaction {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

/// Monthly budget target for one category (spend negative, income positive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub category: String,
    pub budget: f64,
}

/// Current balance of one account type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_type: String,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    #[serde(rename = "Over-Budget")]
    OverBudget,
    #[serde(rename = "Under-Budget")]
    UnderBudget,
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetStatus::OverBudget => f.write_str("Over-Budget"),
            BudgetStatus::UnderBudget => f.write_str("Under-Budget"),
        }
    }
}

/// One evaluated category (or the synthetic profit/loss row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRow {
    pub category: String,
    pub actual: f64,
    pub budget: f64,
    /// `actual - budget`; negative means worse than budget
    pub diff: f64,
    /// `actual / budget`, 0 when the budget is 0
    pub pct_of_budget: f64,
    pub status: BudgetStatus,
}

/// Per-bucket totals. Derived on every query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub bucket: BucketKey,
    /// Sum of negative amounts
    pub spend: f64,
    /// Sum of positive amounts
    pub income: f64,
    /// `income + spend`
    pub profit: f64,
    /// Total budget for the bucket, scaled from monthly targets
    pub budget: f64,
    pub categories: BTreeMap<String, f64>,
    pub transaction_count: u64,
}

impl BucketSummary {
    pub fn empty(bucket: BucketKey) -> Self {
        Self {
            bucket,
            spend: 0.0,
            income: 0.0,
            profit: 0.0,
            budget: 0.0,
            categories: BTreeMap::new(),
            transaction_count: 0,
        }
    }

    pub fn add(&mut self, txn: &MappedTransaction) {
        if txn.amount < 0.0 {
            self.spend += txn.amount;
        } else {
            self.income += txn.amount;
        }
        self.profit += txn.amount;
        *self.categories.entry(txn.category.clone()).or_insert(0.0) += txn.amount;
        self.transaction_count = self.transaction_count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapped(category: &str, amount: f64) -> MappedTransaction {
        MappedTransaction {
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            raw_category: category.to_string(),
            category: category.to_string(),
            meta_category: "living".to_string(),
            amount,
            account: String::new(),
        }
    }

    #[test]
    fn test_bucket_summary_add_splits_spend_and_income() {
        let mut summary = BucketSummary::empty(BucketKey::Month {
            year: 2024,
            month: 3,
        });
        summary.add(&mapped("groceries", -120.0));
        summary.add(&mapped("groceries", -30.0));
        summary.add(&mapped("income", 2000.0));

        assert!((summary.spend - -150.0).abs() < f64::EPSILON);
        assert!((summary.income - 2000.0).abs() < f64::EPSILON);
        assert!((summary.profit - 1850.0).abs() < f64::EPSILON);
        assert_eq!(summary.transaction_count, 3);
        assert!((summary.categories["groceries"] - -150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_budget_status_serializes_with_hyphen() {
        let json = serde_json::to_string(&BudgetStatus::OverBudget).unwrap();
        assert_eq!(json, "\"Over-Budget\"");
        assert_eq!(BudgetStatus::UnderBudget.to_string(), "Under-Budget");
    }
}
