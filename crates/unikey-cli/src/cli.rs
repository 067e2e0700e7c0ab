//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use unikey::input::DEFAULT_EXCLUDE_PATTERN;
use unikey::search::Budget;
use unikey::SearchConfig;

/// unikey: find the minimal column combinations that identify every row
#[derive(Parser)]
#[command(name = "unikey")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging of every tested combination)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find the candidate keys of one data file
    Find {
        /// Path to the data file (CSV/TSV)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        search: SearchArgs,

        /// Output path for the report (default: <stem>_uniquekey_report.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Don't write a report file
        #[arg(long)]
        no_save: bool,
    },

    /// Find the candidate keys of every CSV file in a directory
    Scan {
        /// Directory to scan (not recursive)
        #[arg(value_name = "DIR", default_value = ".")]
        dir: PathBuf,

        /// Regex of file names to skip
        #[arg(long, default_value = DEFAULT_EXCLUDE_PATTERN)]
        exclude: String,

        /// Number of files to analyze at once (default: one per CPU)
        #[arg(short, long)]
        jobs: Option<usize>,

        #[command(flatten)]
        search: SearchArgs,

        /// Don't write report files
        #[arg(long)]
        no_save: bool,
    },

    /// Render a saved report
    Show {
        /// Path to a report written by `find` or `scan`
        #[arg(value_name = "REPORT")]
        report: PathBuf,

        /// List every tested combination
        #[arg(long)]
        trace: bool,

        /// Print the raw JSON instead
        #[arg(long, conflicts_with = "trace")]
        json: bool,
    },
}

/// Search options shared by `find` and `scan`.
#[derive(Args, Clone, Debug)]
pub struct SearchArgs {
    /// Longest key to consider
    #[arg(short = 'k', long)]
    pub max_key_length: Option<usize>,

    /// Comma-separated strategy order (probe, linear, smart, exhaustive)
    #[arg(short, long)]
    pub strategies: Option<String>,

    /// JSON search configuration file; flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Test the combinations of one level in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Per-strategy limit on combinations tested
    #[arg(long, value_name = "N")]
    pub budget_combos: Option<usize>,

    /// Per-strategy time limit in milliseconds
    #[arg(long, value_name = "MS")]
    pub budget_ms: Option<u64>,
}

impl SearchArgs {
    /// Build the search configuration: file first, then flag overrides.
    pub fn to_config(&self) -> Result<SearchConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => SearchConfig::from_file(path)?,
            None => SearchConfig::default(),
        };

        if let Some(max) = self.max_key_length {
            config.max_key_length = max;
        }
        if let Some(list) = &self.strategies {
            config.strategy_order = SearchConfig::parse_order(list)?;
        }
        if self.parallel {
            config.parallel = true;
        }

        if self.budget_combos.is_some() || self.budget_ms.is_some() {
            for kind in config.strategy_order.clone() {
                let mut budget = config.budget_for(kind);
                if let Some(n) = self.budget_combos {
                    budget = budget.with_max_combinations(n);
                }
                if let Some(ms) = self.budget_ms {
                    budget = Budget {
                        max_millis: Some(ms),
                        ..budget
                    };
                }
                config = config.with_budget(kind, budget);
            }
        }

        config.validate()?;
        Ok(config)
    }
}
