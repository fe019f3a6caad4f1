//! Dashboard reports assembled from a loaded `DashboardContext`

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::services::aggregator::{AggFn, Aggregator};
use crate::services::budget::{evaluate, scale_budgets, shift_profit_loss};
use crate::services::bucketer::{bucket_of, filter_to_bucket, iso_weeks_of};
use crate::services::data_loader::DashboardContext;
use crate::services::habits::{habit_progress, score_key_habits, sleep_summary, task_durations};
use crate::types::{
    BucketKey, BucketSummary, BudgetEntry, BudgetRow, Granularity, HabitProgress, HabitScore,
    MappedTransaction, SleepSummary, TaskDuration,
};

/// Account type counted as liquid cash
const BANK_ACCOUNT: &str = "bank";

const HOUSING_CATEGORY: &str = "housing";

/// Housing budget over the expected payment, for bills paid alongside it
const HOUSING_BILLS_FACTOR: f64 = 1.05;

/// One bucket: totals, budget comparison, and meta-category rollup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReport {
    pub reference: NaiveDate,
    pub summary: BucketSummary,
    /// Ends with the `profit/loss` row
    pub budget_rows: Vec<BudgetRow>,
    pub meta_categories: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavingsOutlook {
    pub reference: NaiveDate,
    /// Mean monthly spend over complete months (negative)
    pub average_monthly_spend: f64,
    pub last_month_income: f64,
    /// `(average spend + income) - profit target`; negative means short of target
    pub budget_shortfall: f64,
    /// Monthly spend that still meets the profit target: `-(income - profit target)`
    pub monthly_spending_target: f64,
    /// `average spend - spending target`; negative means spending too much
    pub average_spending_diff: f64,
    pub category_averages: BTreeMap<String, f64>,
    pub bank_balance: f64,
    /// Cash to hold: `saving_months` of average spend
    pub cash_savings_needed: f64,
    pub excess_savings: f64,
}

/// Mean and lower quartile of a monthly series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Projection {
    pub mean: f64,
    pub p25: f64,
}

impl Projection {
    fn of(values: &[f64]) -> Option<Self> {
        let p25 = Aggregator::quantile(values, 0.25)?;
        Some(Self {
            mean: values.iter().sum::<f64>() / values.len() as f64,
            p25,
        })
    }
}

/// Expected monthly flows going forward, from complete months of history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardProjection {
    pub reference: NaiveDate,
    /// Complete months the projection is based on
    pub months: usize,
    pub spending: Option<Projection>,
    pub income: Option<Projection>,
    pub profit: Projection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitReport {
    pub bucket: BucketKey,
    pub key_habits: Vec<HabitScore>,
    pub tracker: Vec<HabitProgress>,
    /// Sleep log averages over the bucket's ISO weeks, if any were logged
    pub sleep: Option<SleepSummary>,
    pub tasks: Vec<TaskDuration>,
}

/// Monthly budgets scaled to `granularity`, with the housing budget taken
/// from the configured housing payment when one is set
fn effective_budgets(ctx: &DashboardContext, granularity: Granularity) -> Vec<BudgetEntry> {
    let mut budgets = scale_budgets(&ctx.budget, granularity);
    if let Some(payment) = ctx.config.housing_payment {
        let housing = payment * granularity.months_per_bucket() * HOUSING_BILLS_FACTOR;
        match budgets.iter_mut().find(|b| b.category == HOUSING_CATEGORY) {
            Some(entry) => entry.budget = housing,
            None => budgets.push(BudgetEntry {
                category: HOUSING_CATEGORY.to_string(),
                budget: housing,
            }),
        }
    }
    budgets
}

fn bucket_budget_total(ctx: &DashboardContext, granularity: Granularity) -> f64 {
    effective_budgets(ctx, granularity)
        .iter()
        .map(|b| b.budget)
        .sum()
}

/// Transactions of the months that ended before `reference`'s month
fn complete_months(ctx: &DashboardContext, reference: NaiveDate) -> Vec<MappedTransaction> {
    let month_start = reference.with_day(1).unwrap_or(reference);
    ctx.transactions
        .iter()
        .filter(|t| t.date < month_start)
        .cloned()
        .collect()
}

/// Totals and budget rows for the bucket containing `reference`.
///
/// Monthly budgets and the monthly profit target are scaled to the bucket length.
/// With a configured housing payment, profit/loss counts that payment in place
/// of the housing actually paid in the bucket.
pub fn period_report(
    ctx: &DashboardContext,
    granularity: Granularity,
    reference: NaiveDate,
) -> PeriodReport {
    let records = filter_to_bucket(&ctx.transactions, granularity, reference);

    let budgets = effective_budgets(ctx, granularity);
    let mut summary = Aggregator::summarize_bucket(&records, granularity, reference);
    summary.budget = budgets.iter().map(|b| b.budget).sum();

    let profit_target = ctx.config.profit_target * granularity.months_per_bucket();
    let mut budget_rows = evaluate(&summary.categories, &budgets, profit_target);

    if let Some(payment) = ctx.config.housing_payment {
        let expected = payment * granularity.months_per_bucket();
        let paid = summary.categories.get(HOUSING_CATEGORY).copied().unwrap_or(0.0);
        shift_profit_loss(&mut budget_rows, expected - paid);
    }

    PeriodReport {
        reference,
        meta_categories: Aggregator::meta_category_totals(&records),
        summary,
        budget_rows,
    }
}

/// Per-bucket summaries from `since_year` on, in bucket order. Excluded
/// categories (bonuses, investment transfers) are left out of the totals.
pub fn history(
    ctx: &DashboardContext,
    granularity: Granularity,
    since_year: i32,
) -> Vec<BucketSummary> {
    let regular: Vec<MappedTransaction> = ctx
        .transactions
        .iter()
        .filter(|t| !ctx.config.excluded_categories.contains(&t.category))
        .cloned()
        .collect();

    let budget = bucket_budget_total(ctx, granularity);
    Aggregator::summarize(&regular, granularity)
        .into_iter()
        .filter(|s| s.bucket.year() >= since_year)
        .map(|mut s| {
            s.budget = budget;
            s
        })
        .collect()
}

/// Spending averages and savings position as of `reference`.
///
/// Only months that ended before `reference`'s month count, so a half-finished
/// month never drags the averages down.
pub fn savings_outlook(ctx: &DashboardContext, reference: NaiveDate) -> SavingsOutlook {
    let config = &ctx.config;
    let complete = complete_months(ctx, reference);

    let non_spend = config.non_spend_categories();
    let average_monthly_spend =
        Aggregator::historical_average(&complete, config.historical_start_year, &non_spend)
            .unwrap_or(0.0);

    let last_month_income = reference
        .with_day(1)
        .and_then(|start| start.pred_opt())
        .map(|last_day| {
            let key = bucket_of(last_day, Granularity::Month);
            complete
                .iter()
                .filter(|t| key.contains(t.date))
                .filter(|t| config.income_categories.contains(&t.category))
                .map(|t| t.amount)
                .sum()
        })
        .unwrap_or(0.0);

    let bank_balance: f64 = ctx
        .accounts
        .iter()
        .filter(|a| a.account_type.trim().eq_ignore_ascii_case(BANK_ACCOUNT))
        .map(|a| a.balance)
        .sum();

    let cash_savings_needed = -average_monthly_spend * config.saving_months;
    let monthly_spending_target = -(last_month_income - config.profit_target);

    SavingsOutlook {
        reference,
        average_monthly_spend,
        last_month_income,
        budget_shortfall: (average_monthly_spend + last_month_income) - config.profit_target,
        monthly_spending_target,
        average_spending_diff: average_monthly_spend - monthly_spending_target,
        category_averages: Aggregator::category_averages(
            &complete,
            Granularity::Month,
            config.historical_start_year,
            &non_spend,
        ),
        bank_balance,
        cash_savings_needed,
        excess_savings: bank_balance - cash_savings_needed,
    }
}

/// Monthly totals of the transactions `keep` accepts, from `since_year` on.
/// Months where nothing matched are absent rather than zero.
fn monthly_series<F>(records: &[MappedTransaction], since_year: i32, keep: F) -> Vec<f64>
where
    F: Fn(&MappedTransaction) -> bool,
{
    let kept: Vec<&MappedTransaction> = records.iter().filter(|t| keep(*t)).collect();
    Aggregator::aggregate(
        &kept,
        |t| bucket_of(t.date, Granularity::Month),
        |t| t.amount,
        AggFn::Sum,
    )
    .into_iter()
    .filter(|(k, _)| k.year() >= since_year)
    .map(|(_, total)| total)
    .collect()
}

/// Forward monthly spending, income, and profit from complete months before
/// `reference`: the mean as the expected case, the 25th percentile as the
/// cautious one. `None` when there is no complete month to project from.
pub fn forward_projection(ctx: &DashboardContext, reference: NaiveDate) -> Option<ForwardProjection> {
    let config = &ctx.config;
    let complete = complete_months(ctx, reference);
    let since = config.historical_start_year;
    let non_spend = config.non_spend_categories();

    let profit = monthly_series(&complete, since, |t| {
        !config.excluded_categories.contains(&t.category)
    });
    let spending = monthly_series(&complete, since, |t| !non_spend.contains(&t.category));
    let income = monthly_series(&complete, since, |t| {
        config.income_categories.contains(&t.category)
    });

    Some(ForwardProjection {
        reference,
        months: profit.len(),
        profit: Projection::of(&profit)?,
        spending: Projection::of(&spending),
        income: Projection::of(&income),
    })
}

/// Key-habit scores, tracker progress, sleep averages, and task hours for one bucket
pub fn habit_report(
    ctx: &DashboardContext,
    granularity: Granularity,
    reference: NaiveDate,
) -> HabitReport {
    let bucket = bucket_of(reference, granularity);
    let weeks = iso_weeks_of(bucket);
    // Sleep rows carry only a week number, so any logged year matches
    let sleep = if weeks.is_empty() {
        None
    } else {
        sleep_summary(&ctx.sleep_log, &weeks).ok()
    };

    HabitReport {
        bucket,
        key_habits: score_key_habits(
            &ctx.observations,
            &ctx.config.key_habits,
            granularity,
            reference,
        ),
        tracker: habit_progress(&ctx.habit_counts, granularity, reference),
        sleep,
        tasks: task_durations(
            &ctx.tasks,
            &ctx.config.aggregate_task_categories,
            granularity,
            reference,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserConfig;
    use crate::services::budget::PROFIT_LOSS_CATEGORY;
    use crate::services::data_loader::DataLoaderService;
    use crate::services::store::MemoryExtractStore;
    use crate::types::{BudgetStatus, HabitValue};
    use chrono::NaiveTime;
    use std::fs;
    use std::path::PathBuf;

    fn fixture(name: &str) -> Vec<u8> {
        fs::read(
            PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("tests")
                .join("fixtures")
                .join(name),
        )
        .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn context() -> DashboardContext {
        let config =
            UserConfig::from_json(&String::from_utf8(fixture("config.json")).unwrap()).unwrap();
        let store = MemoryExtractStore::new()
            .with("daily_finances", date(2024, 3, 31), fixture("daily_finances_2024-03-31.csv"))
            .with("monthly_budget", date(2024, 1, 1), fixture("monthly_budget_2024-01-01.csv"))
            .with("account_totals", date(2024, 3, 31), "account_type,balance\nbank,20000\ninvestment,50000\n")
            .with(
                "exist_data",
                date(2024, 3, 15),
                "date,attribute,value\n2024-03-04,steps,5000\n2024-03-05,steps,3000\n2024-03-04,sleep_start,600\n",
            )
            .with("marvin_habits", date(2024, 3, 15), fixture("marvin_habits_2024-03-15.json"))
            .with("sleep_log", date(2024, 3, 15), fixture("sleep_log_2024-03-15.csv"))
            .with("marvin_tasks", date(2024, 3, 15), fixture("marvin_tasks_2024-03-15.csv"));
        DataLoaderService::new(store).load(config).unwrap()
    }

    fn row<'a>(report: &'a PeriodReport, category: &str) -> &'a BudgetRow {
        report
            .budget_rows
            .iter()
            .find(|r| r.category == category)
            .unwrap()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn mapped(d: NaiveDate, category: &str, meta: &str, amount: f64) -> MappedTransaction {
        MappedTransaction {
            date: d,
            raw_category: category.to_string(),
            category: category.to_string(),
            meta_category: meta.to_string(),
            amount,
            account: String::new(),
        }
    }

    // ========== period_report tests ==========

    #[test]
    fn test_month_report() {
        let report = period_report(&context(), Granularity::Month, date(2024, 3, 15));

        assert_eq!(report.summary.bucket.to_string(), "2024-03");
        assert!(approx(report.summary.spend, -1850.0));
        assert!(approx(report.summary.income, 5000.0));
        assert!(approx(report.summary.profit, 3150.0));
        assert!(approx(report.summary.budget, 2750.0));

        // groceries, housing, income, then profit/loss; dining had no activity
        assert_eq!(report.budget_rows.len(), 4);
        assert_eq!(report.budget_rows[3].category, PROFIT_LOSS_CATEGORY);
        assert!(approx(row(&report, "groceries").diff, 250.0));
        assert_eq!(row(&report, "groceries").status, BudgetStatus::UnderBudget);
        assert_eq!(row(&report, "housing").status, BudgetStatus::UnderBudget);
        assert!(approx(row(&report, PROFIT_LOSS_CATEGORY).diff, 150.0));

        assert!(approx(report.meta_categories["living"], -1850.0));
        assert!(approx(report.meta_categories["earning"], 5000.0));
    }

    #[test]
    fn test_month_report_with_housing_payment() {
        let mut ctx = context();
        ctx.config.housing_payment = Some(-1800.0);

        let report = period_report(&ctx, Granularity::Month, date(2024, 3, 15));

        let housing = row(&report, "housing");
        assert!(approx(housing.actual, -1700.0));
        assert!(approx(housing.budget, -1890.0));
        assert_eq!(housing.status, BudgetStatus::UnderBudget);
        // 3150 actual profit, minus the 100 more housing will cost
        let pl = row(&report, PROFIT_LOSS_CATEGORY);
        assert!(approx(pl.actual, 3050.0));
        assert!(approx(pl.diff, 50.0));
        assert!(approx(report.summary.budget, 2560.0));
        assert!(approx(report.summary.profit, 3150.0));
    }

    #[test]
    fn test_quarter_report_scales_budget_and_target() {
        let report = period_report(&context(), Granularity::Quarter, date(2024, 2, 1));

        assert_eq!(report.summary.transaction_count, 10);
        let groceries = row(&report, "groceries");
        assert!(approx(groceries.actual, -600.0));
        assert!(approx(groceries.budget, -1200.0));
        let pl = row(&report, PROFIT_LOSS_CATEGORY);
        assert!(approx(pl.actual, 9300.0));
        assert!(approx(pl.budget, 9000.0));
        assert_eq!(pl.status, BudgetStatus::UnderBudget);
    }

    #[test]
    fn test_week_report() {
        // ISO week 10 of 2024: Mon 03-04 .. Sun 03-10
        let report = period_report(&context(), Granularity::Week, date(2024, 3, 10));

        assert_eq!(report.summary.bucket.to_string(), "2024-W10");
        assert_eq!(report.summary.transaction_count, 2);
        let housing = row(&report, "housing");
        assert!(approx(housing.budget, -1700.0 * 12.0 / 52.0));
        assert_eq!(housing.status, BudgetStatus::OverBudget);
    }

    #[test]
    fn test_report_for_empty_bucket() {
        let report = period_report(&context(), Granularity::Month, date(2023, 6, 1));
        assert_eq!(report.summary.transaction_count, 0);
        assert_eq!(report.budget_rows.len(), 1);
        assert_eq!(report.budget_rows[0].status, BudgetStatus::OverBudget);
    }

    // ========== history tests ==========

    #[test]
    fn test_history_months_in_order() {
        let months = history(&context(), Granularity::Month, 2024);
        let keys: Vec<String> = months.iter().map(|s| s.bucket.to_string()).collect();
        assert_eq!(keys, vec!["2024-01", "2024-02", "2024-03"]);
        assert!(approx(months[1].profit, 3050.0));
    }

    #[test]
    fn test_history_quarter_total_matches_months() {
        let ctx = context();
        let quarters = history(&ctx, Granularity::Quarter, 2024);
        let months = history(&ctx, Granularity::Month, 2024);
        assert_eq!(quarters.len(), 1);
        let month_total: f64 = months.iter().map(|s| s.profit).sum();
        assert!(approx(quarters[0].profit, month_total));
    }

    #[test]
    fn test_history_leaves_out_excluded_categories() {
        let ctx = DashboardContext {
            transactions: vec![
                mapped(date(2024, 1, 5), "income", "earning", 5000.0),
                mapped(date(2024, 1, 10), "housing", "living", -1700.0),
                mapped(date(2024, 2, 20), "bonus", "earning", 20000.0),
            ],
            ..DashboardContext::default()
        };

        let quarters = history(&ctx, Granularity::Quarter, 2024);

        assert_eq!(quarters.len(), 1);
        assert!(approx(quarters[0].profit, 3300.0));
        assert_eq!(quarters[0].transaction_count, 2);
        assert!(!quarters[0].categories.contains_key("bonus"));
    }

    #[test]
    fn test_history_since_year_filters() {
        assert!(history(&context(), Granularity::Year, 2025).is_empty());
    }

    // ========== savings_outlook tests ==========

    #[test]
    fn test_savings_outlook() {
        let outlook = savings_outlook(&context(), date(2024, 4, 10));

        assert!(approx(outlook.average_monthly_spend, -1900.0));
        assert!(approx(outlook.last_month_income, 5000.0));
        assert!(approx(outlook.budget_shortfall, 100.0));
        assert!(approx(outlook.monthly_spending_target, -2000.0));
        assert!(approx(outlook.average_spending_diff, 100.0));
        assert!(approx(outlook.category_averages["groceries"], -200.0));
        assert!(approx(outlook.category_averages["housing"], -1700.0));
        assert!(!outlook.category_averages.contains_key("income"));
        assert!(approx(outlook.bank_balance, 20000.0));
        assert!(approx(outlook.cash_savings_needed, 15200.0));
        assert!(approx(outlook.excess_savings, 4800.0));
    }

    #[test]
    fn test_savings_outlook_ignores_current_month() {
        // March is still running on 03-20, so only January and February count
        let outlook = savings_outlook(&context(), date(2024, 3, 20));
        assert!(approx(outlook.average_monthly_spend, -1925.0));
        assert!(approx(outlook.last_month_income, 5000.0));
    }

    #[test]
    fn test_savings_outlook_without_history() {
        let outlook = savings_outlook(&context(), date(2024, 1, 15));
        assert_eq!(outlook.average_monthly_spend, 0.0);
        assert_eq!(outlook.last_month_income, 0.0);
        assert!(approx(outlook.budget_shortfall, -3000.0));
    }

    // ========== forward_projection tests ==========

    #[test]
    fn test_forward_projection() {
        let projection = forward_projection(&context(), date(2024, 4, 10)).unwrap();

        assert_eq!(projection.months, 3);
        let spending = projection.spending.unwrap();
        assert!(approx(spending.mean, -1900.0));
        assert!(approx(spending.p25, -1925.0));
        let income = projection.income.unwrap();
        assert!(approx(income.mean, 5000.0));
        assert!(approx(income.p25, 5000.0));
        assert!(approx(projection.profit.mean, 3100.0));
        assert!(approx(projection.profit.p25, 3075.0));
    }

    #[test]
    fn test_forward_projection_leaves_out_excluded_categories() {
        let mut ctx = context();
        ctx.transactions
            .push(mapped(date(2024, 2, 20), "bonus", "earning", 20000.0));

        let projection = forward_projection(&ctx, date(2024, 4, 10)).unwrap();
        assert!(approx(projection.profit.mean, 3100.0));
        assert!(approx(projection.income.unwrap().mean, 5000.0));
    }

    #[test]
    fn test_forward_projection_without_history() {
        assert!(forward_projection(&context(), date(2024, 1, 15)).is_none());
    }

    // ========== habit_report tests ==========

    #[test]
    fn test_habit_report_week() {
        let report = habit_report(&context(), Granularity::Week, date(2024, 3, 6));

        assert_eq!(report.bucket.to_string(), "2024-W10");
        assert_eq!(report.key_habits.len(), 2);
        let steps = &report.key_habits[0];
        assert_eq!(steps.achieved_days, 1);
        assert!(approx(steps.hit_rate, 0.5));
        let bed = &report.key_habits[1];
        assert_eq!(bed.average, Some(HabitValue::Clock(chrono::NaiveTime::from_hms_opt(22, 0, 0).unwrap())));
        assert_eq!(bed.achieved_days, 1);

        let workout = report.tracker.iter().find(|p| p.habit == "Workout").unwrap();
        assert!(approx(workout.value, 2.0));
        assert!(approx(workout.target, 3.0));
        assert!(!workout.met);

        let sleep = report.sleep.unwrap();
        assert_eq!(sleep.weeks, 1);
        assert_eq!(sleep.wake, NaiveTime::from_hms_opt(6, 50, 0).unwrap());
        assert_eq!(sleep.bed, NaiveTime::from_hms_opt(0, 20, 0).unwrap());
        assert!(approx(sleep.duration_minutes, 450.0));

        assert_eq!(report.tasks.len(), 1);
        assert_eq!(report.tasks[0].category, "Reports");
        assert!(approx(report.tasks[0].hours, 4.5));
    }

    #[test]
    fn test_habit_report_month_sleep_and_tasks() {
        let report = habit_report(&context(), Granularity::Month, date(2024, 3, 20));

        // weeks 9 to 13 touch March; 9, 10 and 11 have valid log rows
        let sleep = report.sleep.unwrap();
        assert_eq!(sleep.weeks, 3);
        assert!(approx(sleep.duration_minutes, 470.0));

        let categories: Vec<&str> = report.tasks.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(categories, vec!["Reports", "Music"]);
    }

    #[test]
    fn test_habit_report_week_without_sleep_rows() {
        // week 12's row has an unreadable wake time and was dropped
        let report = habit_report(&context(), Granularity::Week, date(2024, 3, 20));
        assert!(report.sleep.is_none());
    }
}
