//! Plain-text tables for terminal output

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::services::report::{
    ForwardProjection, HabitReport, PeriodReport, Projection, SavingsOutlook,
};
use crate::types::{BucketSummary, LoadWarning, SleepSummary};

fn money(v: f64) -> String {
    format!("{:.2}", v)
}

fn minutes_as_hm(minutes: f64) -> String {
    let total = minutes.round() as i64;
    format!("{}h{:02}", total / 60, total % 60)
}

pub fn period_report(report: &PeriodReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    let _ = writeln!(out, "Period {} ({} transactions)", s.bucket, s.transaction_count);
    let _ = writeln!(
        out,
        "  spend {}   income {}   profit {}   budget {}",
        money(s.spend),
        money(s.income),
        money(s.profit),
        money(s.budget)
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<20} {:>12} {:>12} {:>12} {:>8}  {}",
        "CATEGORY", "ACTUAL", "BUDGET", "DIFF", "PCT", "STATUS"
    );
    for row in &report.budget_rows {
        let _ = writeln!(
            out,
            "{:<20} {:>12} {:>12} {:>12} {:>7.0}%  {}",
            row.category,
            money(row.actual),
            money(row.budget),
            money(row.diff),
            row.pct_of_budget * 100.0,
            row.status
        );
    }
    if !report.meta_categories.is_empty() {
        let _ = writeln!(out);
        for (meta, total) in &report.meta_categories {
            let _ = writeln!(out, "{:<20} {:>12}", meta, money(*total));
        }
    }
    out
}

pub fn history(summaries: &[BucketSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:>12} {:>12} {:>12} {:>12}",
        "PERIOD", "SPEND", "INCOME", "PROFIT", "BUDGET"
    );
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<10} {:>12} {:>12} {:>12} {:>12}",
            s.bucket.to_string(),
            money(s.spend),
            money(s.income),
            money(s.profit),
            money(s.budget)
        );
    }
    out
}

pub fn habits(report: &HabitReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Habits {}", report.bucket);
    let _ = writeln!(
        out,
        "{:<16} {:>8} {:>8} {:>6} {:>9}",
        "ATTRIBUTE", "TARGET", "AVERAGE", "DAYS", "HIT RATE"
    );
    for score in &report.key_habits {
        let average = score
            .average
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<16} {:>8} {:>8} {:>2}/{:<3} {:>8.0}%",
            score.attribute,
            score.target.to_string(),
            average,
            score.achieved_days,
            score.observed_days,
            score.hit_rate * 100.0
        );
    }
    if !report.tracker.is_empty() {
        let _ = writeln!(out);
        for p in &report.tracker {
            let mark = if p.met { "ok" } else { "--" };
            let _ = writeln!(
                out,
                "{:<16} {:>6.0} / {:<6.0} {}",
                p.habit, p.value, p.target, mark
            );
        }
    }
    if let Some(summary) = &report.sleep {
        let _ = writeln!(out);
        out.push_str(&sleep(summary));
    }
    if !report.tasks.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<16} {:>8}", "TASKS", "HOURS");
        for t in &report.tasks {
            let _ = writeln!(out, "{:<16} {:>8.1}", t.category, t.hours);
        }
    }
    out
}

pub fn sleep(summary: &SleepSummary) -> String {
    format!(
        "Sleep over {} weeks\n  wake {}   bed {}   duration {}\n",
        summary.weeks,
        summary.wake.format("%H:%M"),
        summary.bed.format("%H:%M"),
        minutes_as_hm(summary.duration_minutes)
    )
}

pub fn outlook(o: &SavingsOutlook) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Outlook as of {}", o.reference);
    let lines = [
        ("average monthly spend", o.average_monthly_spend),
        ("last month income", o.last_month_income),
        ("budget shortfall", o.budget_shortfall),
        ("spending target", o.monthly_spending_target),
        ("avg spending diff", o.average_spending_diff),
        ("bank balance", o.bank_balance),
        ("cash savings needed", o.cash_savings_needed),
        ("excess savings", o.excess_savings),
    ];
    for (label, value) in lines {
        let _ = writeln!(out, "  {:<22} {:>12}", label, money(value));
    }
    if !o.category_averages.is_empty() {
        let _ = writeln!(out);
        for (category, avg) in &o.category_averages {
            let _ = writeln!(out, "  {:<22} {:>12}", category, money(*avg));
        }
    }
    out
}

pub fn projection(p: &ForwardProjection) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Projection from {} complete months before {}",
        p.months, p.reference
    );
    let _ = writeln!(out, "  {:<10} {:>12} {:>12}", "", "MEAN", "P25");
    let lines = [
        ("spending", p.spending),
        ("income", p.income),
        ("profit", Some(p.profit)),
    ];
    for (label, value) in lines {
        match value {
            Some(Projection { mean, p25 }) => {
                let _ = writeln!(out, "  {:<10} {:>12} {:>12}", label, money(mean), money(p25));
            }
            None => {
                let _ = writeln!(out, "  {:<10} {:>12} {:>12}", label, "-", "-");
            }
        }
    }
    out
}

pub fn sources(catalog: &BTreeMap<String, Vec<NaiveDate>>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<16} {:>8}  {}", "SOURCE", "VERSIONS", "LATEST");
    for (source, versions) in catalog {
        let latest = versions
            .last()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "{:<16} {:>8}  {}", source, versions.len(), latest);
    }
    out
}

pub fn warnings(warnings: &[LoadWarning]) -> String {
    warnings
        .iter()
        .map(|w| format!("[checkin] Warning: {}\n", w))
        .collect()
}
