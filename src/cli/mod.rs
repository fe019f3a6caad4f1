mod render;

use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::config::UserConfig;
use crate::parsers::SOURCE_IDS;
use crate::services::data_loader::{DashboardContext, DataLoaderService};
use crate::services::habits::sleep_summary;
use crate::services::report::{
    forward_projection, habit_report, history, period_report, savings_outlook,
};
use crate::services::store::FileExtractStore;
use crate::types::Granularity;

/// Personal finance and habit check-in
#[derive(Parser)]
#[command(name = "checkin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.checkin/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Extract store directory (default: ~/.checkin/cache)
    #[arg(long, global = true, value_name = "DIR")]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Period selection shared by the bucketed reports
#[derive(Args, Debug, Clone, PartialEq)]
struct PeriodArgs {
    /// week, month, quarter, or year
    #[arg(short, long, default_value = "month")]
    granularity: Granularity,

    /// Any date inside the period (YYYY-MM-DD, default: today)
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl Default for PeriodArgs {
    fn default() -> Self {
        Self {
            granularity: Granularity::Month,
            date: None,
            json: false,
        }
    }
}

impl PeriodArgs {
    fn reference(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Budget vs. actual for one period (default)
    Report(PeriodArgs),

    /// Totals for every period since a year
    History {
        /// week, month, quarter, or year
        #[arg(short, long, default_value = "quarter")]
        granularity: Granularity,

        /// First year to include (default: historical_start_year from config)
        #[arg(long)]
        since: Option<i32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Key habit scores, habit tracker progress, sleep, and task hours
    Habits(PeriodArgs),

    /// Average wake time, bedtime, and sleep duration
    Sleep {
        /// ISO week numbers to include (default: all logged weeks)
        #[arg(long, num_args = 1..)]
        weeks: Vec<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Spending averages and savings position
    Outlook {
        /// Reference date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Expected monthly spending, income, and profit going forward
    Project {
        /// Reference date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List extract versions in the store
    Sources {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete all but the newest extract of each source
    Prune {
        /// Only prune this source
        source: Option<String>,
    },
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let config = UserConfig::load(self.config.as_deref()).context("Failed to load config")?;
        let store = match self.store.clone().or_else(|| config.store_dir.clone()) {
            Some(dir) => FileExtractStore::with_dir(dir),
            None => FileExtractStore::new()?,
        };

        match self.command.unwrap_or(Commands::Report(PeriodArgs::default())) {
            Commands::Sources { json } => {
                let catalog = store.catalog()?;
                if json {
                    print_json(&catalog)
                } else {
                    println!("Store {}", store.dir().display());
                    print!("{}", render::sources(&catalog));
                    Ok(())
                }
            }
            Commands::Prune { source } => {
                let sources: Vec<String> = match source {
                    Some(s) => vec![s],
                    None => SOURCE_IDS.iter().map(|s| s.to_string()).collect(),
                };
                for source in sources {
                    let removed = store.prune(&source)?;
                    if !removed.is_empty() {
                        println!("{}: removed {} old extract(s)", source, removed.len());
                    }
                }
                Ok(())
            }
            command => {
                let ctx = DataLoaderService::new(store).load(config)?;
                eprint!("{}", render::warnings(&ctx.warnings));
                run_report(&ctx, command)
            }
        }
    }
}

fn run_report(ctx: &DashboardContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Report(args) => {
            let report = period_report(ctx, args.granularity, args.reference());
            if args.json {
                return print_json(&report);
            }
            print!("{}", render::period_report(&report));
        }
        Commands::History {
            granularity,
            since,
            json,
        } => {
            let since = since.unwrap_or(ctx.config.historical_start_year);
            let summaries = history(ctx, granularity, since);
            if json {
                return print_json(&summaries);
            }
            print!("{}", render::history(&summaries));
        }
        Commands::Habits(args) => {
            let report = habit_report(ctx, args.granularity, args.reference());
            if args.json {
                return print_json(&report);
            }
            print!("{}", render::habits(&report));
        }
        Commands::Sleep { weeks, json } => {
            let summary = sleep_summary(&ctx.sleep_log, &weeks)?;
            if json {
                return print_json(&summary);
            }
            print!("{}", render::sleep(&summary));
        }
        Commands::Outlook { date, json } => {
            let reference = date.unwrap_or_else(|| Local::now().date_naive());
            let outlook = savings_outlook(ctx, reference);
            if json {
                return print_json(&outlook);
            }
            print!("{}", render::outlook(&outlook));
        }
        Commands::Project { date, json } => {
            let reference = date.unwrap_or_else(|| Local::now().date_naive());
            let projection = forward_projection(ctx, reference);
            if json {
                return print_json(&projection);
            }
            match projection {
                Some(p) => print!("{}", render::projection(&p)),
                None => println!("No complete months before {} to project from", reference),
            }
        }
        Commands::Sources { .. } | Commands::Prune { .. } => {}
    }
    Ok(())
}
