//! Budget evaluation: actual category totals against budget targets

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::types::{finite_or_zero, BudgetEntry, BudgetRow, BudgetStatus, Granularity};

/// Name of the synthetic row comparing total signed flow to the profit target
pub const PROFIT_LOSS_CATEGORY: &str = "profit/loss";

/// `diff < 0` is over budget; a zero diff counts as under budget.
pub fn classify(diff: f64) -> BudgetStatus {
    if diff < 0.0 {
        BudgetStatus::OverBudget
    } else {
        BudgetStatus::UnderBudget
    }
}

fn make_row(category: &str, actual: f64, budget: f64) -> BudgetRow {
    let diff = finite_or_zero(actual - budget);
    BudgetRow {
        category: category.to_string(),
        actual,
        budget,
        diff,
        pct_of_budget: finite_or_zero(actual / budget),
        status: classify(diff),
    }
}

/// Scale monthly budget entries to a bucket of `granularity`
pub fn scale_budgets(budgets: &[BudgetEntry], granularity: Granularity) -> Vec<BudgetEntry> {
    let factor = granularity.months_per_bucket();
    budgets
        .iter()
        .map(|b| BudgetEntry {
            category: b.category.clone(),
            budget: b.budget * factor,
        })
        .collect()
}

/// Compare each category's actual total with its budget.
///
/// Categories without a budget entry get a budget of 0, so unbudgeted
/// spending shows up as over budget. A final `profit/loss` row compares the
/// total signed flow with `profit_target`.
pub fn evaluate(
    actuals: &BTreeMap<String, f64>,
    budgets: &[BudgetEntry],
    profit_target: f64,
) -> Vec<BudgetRow> {
    let budget_map: HashMap<&str, f64> = budgets
        .iter()
        .map(|b| (b.category.as_str(), b.budget))
        .collect();

    let mut rows: Vec<BudgetRow> = actuals
        .iter()
        .map(|(category, actual)| {
            let budget = budget_map.get(category.as_str()).copied().unwrap_or(0.0);
            make_row(category, *actual, budget)
        })
        .collect();

    let idle: Vec<&str> = budget_map
        .keys()
        .filter(|c| !actuals.contains_key(**c))
        .copied()
        .collect();
    if !idle.is_empty() {
        debug!(?idle, "budgeted categories without activity");
    }

    let total: f64 = actuals.values().sum();
    rows.push(make_row(PROFIT_LOSS_CATEGORY, total, profit_target));
    rows
}

/// Add `delta` to the actual of the `profit/loss` row and re-evaluate it.
/// Rows without a `profit/loss` row are left unchanged.
pub fn shift_profit_loss(rows: &mut [BudgetRow], delta: f64) {
    if let Some(row) = rows.iter_mut().find(|r| r.category == PROFIT_LOSS_CATEGORY) {
        *row = make_row(PROFIT_LOSS_CATEGORY, row.actual + delta, row.budget);
    }
}
