//! Finance extract parsers: transactions, account balances, monthly budget

use serde::Deserialize;
use tracing::warn;

use super::{parse_amount, parse_csv, parse_date, SourceParser};
use crate::types::{AccountBalance, BudgetEntry, Result, Transaction};

#[derive(Deserialize)]
struct TransactionRow {
    date: String,
    category: String,
    amount: String,
    #[serde(default)]
    account: Option<String>,
}

/// Parser for the aggregator's daily transaction export
#[derive(Debug, Default, Clone, Copy)]
pub struct TransactionsParser;

impl TransactionsParser {
    pub const SOURCE: &'static str = "daily_finances";
}

impl SourceParser for TransactionsParser {
    type Record = Transaction;

    fn source_id(&self) -> &'static str {
        Self::SOURCE
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = parse_csv(
            Self::SOURCE,
            data,
            &[&["date"], &["category"], &["amount"]],
        )?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let date = parse_date(&row.date);
                let amount = parse_amount(&row.amount);
                match (date, amount) {
                    (Some(date), Some(amount)) => Some(Transaction {
                        date,
                        raw_category: row.category,
                        amount,
                        account: row.account.unwrap_or_default(),
                    }),
                    _ => {
                        warn!(
                            source = Self::SOURCE,
                            date = %row.date,
                            amount = %row.amount,
                            "skipping transaction with bad date or amount"
                        );
                        None
                    }
                }
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct AccountRow {
    account_type: String,
    #[serde(alias = "total")]
    balance: String,
}

/// Parser for per-account-type balance totals
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountsParser;

impl AccountsParser {
    pub const SOURCE: &'static str = "account_totals";
}

impl SourceParser for AccountsParser {
    type Record = AccountBalance;

    fn source_id(&self) -> &'static str {
        Self::SOURCE
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<AccountBalance>> {
        let rows: Vec<AccountRow> = parse_csv(
            Self::SOURCE,
            data,
            &[&["account_type"], &["balance", "total"]],
        )?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match parse_amount(&row.balance) {
                Some(balance) => Some(AccountBalance {
                    account_type: row.account_type,
                    balance,
                }),
                None => {
                    warn!(source = Self::SOURCE, account = %row.account_type, "skipping bad balance");
                    None
                }
            })
            .collect())
    }
}

#[derive(Deserialize)]
struct BudgetSheetRow {
    category: String,
    budget: String,
}

/// Parser for the monthly budget sheet
#[derive(Debug, Default, Clone, Copy)]
pub struct BudgetParser;

impl BudgetParser {
    pub const SOURCE: &'static str = "monthly_budget";
}

impl SourceParser for BudgetParser {
    type Record = BudgetEntry;

    fn source_id(&self) -> &'static str {
        Self::SOURCE
    }

    fn parse(&self, data: &[u8]) -> Result<Vec<BudgetEntry>> {
        let rows: Vec<BudgetSheetRow> = parse_csv(Self::SOURCE, data, &[&["category"], &["budget"]])?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match parse_amount(&row.budget) {
                Some(budget) => Some(BudgetEntry {
                    category: row.category,
                    budget,
                }),
                None => {
                    warn!(source = Self::SOURCE, category = %row.category, "skipping bad budget");
                    None
                }
            })
            .collect())
    }
}
