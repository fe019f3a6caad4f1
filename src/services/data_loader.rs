//! Data loading service
//!
//! Pulls the newest extract of every source from an `ExtractStore`, parses
//! it, and assembles the `DashboardContext` a single request works from.
//! Finance and habit sources load concurrently.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::UserConfig;
use crate::parsers::{
    AccountsParser, AttributesParser, BudgetParser, HabitHistoryParser, SleepLogParser,
    SourceParser, TasksParser, TransactionsParser,
};
use crate::services::category_mapper::map_categories;
use crate::services::store::ExtractStore;
use crate::types::{
    AccountBalance, BudgetEntry, CheckinError, HabitCount, HabitObservation, LoadWarning,
    MappedTransaction, Result, SleepLogRow, TaskEntry,
};

/// Everything one report request needs, built fresh per request
#[derive(Debug, Clone, Default)]
pub struct DashboardContext {
    pub config: UserConfig,
    /// Transactions that resolved to a configured category
    pub transactions: Vec<MappedTransaction>,
    /// Monthly budget, from the store or the config fallback
    pub budget: Vec<BudgetEntry>,
    pub accounts: Vec<AccountBalance>,
    pub observations: Vec<HabitObservation>,
    pub habit_counts: Vec<HabitCount>,
    pub sleep_log: Vec<SleepLogRow>,
    pub tasks: Vec<TaskEntry>,
    /// Extract version used per source
    pub versions: BTreeMap<String, NaiveDate>,
    pub warnings: Vec<LoadWarning>,
}

/// Records of one source plus how they were obtained
#[derive(Debug)]
struct Loaded<T> {
    source: &'static str,
    version: Option<NaiveDate>,
    records: Vec<T>,
    warning: Option<LoadWarning>,
}

impl<T> Loaded<T> {
    fn record_into(self, versions: &mut BTreeMap<String, NaiveDate>, warnings: &mut Vec<LoadWarning>) -> Vec<T> {
        if let Some(version) = self.version {
            versions.insert(self.source.to_string(), version);
        }
        if let Some(warning) = self.warning {
            warnings.push(warning);
        }
        self.records
    }
}

type FinanceSources = (Loaded<BudgetEntry>, Loaded<AccountBalance>);
type HabitSources = (
    Loaded<HabitObservation>,
    Loaded<HabitCount>,
    Loaded<SleepLogRow>,
    Loaded<TaskEntry>,
);

/// Loader over any extract store
pub struct DataLoaderService<S: ExtractStore> {
    store: S,
}

impl<S: ExtractStore> DataLoaderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Build the context for one request.
    ///
    /// Transactions are required; every other source degrades to a warning.
    pub fn load(&self, config: UserConfig) -> Result<DashboardContext> {
        let table = config.category_table()?;

        let ((transactions, finance), habits) = rayon::join(
            || {
                (
                    self.load_required(&TransactionsParser),
                    self.load_finance(),
                )
            },
            || self.load_habits(),
        );
        let transactions = transactions?;
        let (budget, accounts) = finance;
        let (observations, habit_counts, sleep_log, tasks) = habits;

        let mut versions = BTreeMap::new();
        let mut warnings = Vec::new();

        let raw = transactions.record_into(&mut versions, &mut warnings);
        let mut budget = budget.record_into(&mut versions, &mut warnings);
        if budget.is_empty() {
            debug!("no budget extract, using config budget");
            budget = config.budget_entries();
        }

        let context = DashboardContext {
            transactions: map_categories(&raw, &table),
            budget,
            accounts: accounts.record_into(&mut versions, &mut warnings),
            observations: observations.record_into(&mut versions, &mut warnings),
            habit_counts: habit_counts.record_into(&mut versions, &mut warnings),
            sleep_log: sleep_log.record_into(&mut versions, &mut warnings),
            tasks: tasks.record_into(&mut versions, &mut warnings),
            config,
            versions,
            warnings,
        };

        for warning in &context.warnings {
            warn!(%warning, "optional source unavailable");
        }
        Ok(context)
    }

    fn load_finance(&self) -> FinanceSources {
        (
            self.load_optional(&BudgetParser),
            self.load_optional(&AccountsParser),
        )
    }

    fn load_habits(&self) -> HabitSources {
        (
            self.load_optional(&AttributesParser),
            self.load_optional(&HabitHistoryParser),
            self.load_optional(&SleepLogParser),
            self.load_optional(&TasksParser),
        )
    }

    fn load_required<P: SourceParser>(&self, parser: &P) -> Result<Loaded<P::Record>> {
        let source = parser.source_id();
        let extract = self.store.latest(source)?;
        let records = parser.parse(&extract.data)?;
        debug!(source, version = %extract.version, count = records.len(), "loaded source");
        Ok(Loaded {
            source,
            version: Some(extract.version),
            records,
            warning: None,
        })
    }

    fn load_optional<P: SourceParser>(&self, parser: &P) -> Loaded<P::Record> {
        let source = parser.source_id();
        match self.load_required(parser) {
            Ok(loaded) => loaded,
            Err(CheckinError::NoDataAvailable(_)) => Loaded {
                source,
                version: None,
                records: Vec::new(),
                warning: Some(LoadWarning::MissingSource(source.to_string())),
            },
            Err(e) => Loaded {
                source,
                version: None,
                records: Vec::new(),
                warning: Some(LoadWarning::Unreadable(format!("{}: {}", source, e))),
            },
        }
    }
}
