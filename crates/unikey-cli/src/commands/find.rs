//! Find command - discover the candidate keys of one data file.

use std::path::PathBuf;

use colored::Colorize;
use unikey::search::AttemptStatus;
use unikey::{report_path_for, AnalysisResult, KeyFinder};

use crate::cli::SearchArgs;

pub fn run(
    file: PathBuf,
    search: SearchArgs,
    output: Option<PathBuf>,
    no_save: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !file.exists() {
        return Err(format!("File not found: {}", file.display()).into());
    }

    let config = search.to_config()?;

    println!(
        "{} {}",
        "Analyzing".cyan().bold(),
        file.display().to_string().white()
    );

    let finder = KeyFinder::with_config(config);
    let result = finder.analyze(&file)?;

    println!(
        "{} rows, {} columns",
        result.outcome.row_count.to_string().white().bold(),
        result.outcome.column_count.to_string().white().bold()
    );

    if verbose {
        println!();
        println!("{}", "Columns:".yellow().bold());
        for profile in &result.outcome.profiles {
            println!(
                "  {:20} {:>8} distinct {:>6} null  {:.3}",
                profile.name, profile.distinct_count, profile.null_count, profile.uniqueness_ratio
            );
        }
    }

    println!();
    print_attempts(&result);
    println!();
    print_keys(&result);

    if !no_save {
        let output_path = output.unwrap_or_else(|| report_path_for(&file));
        result.save(&output_path)?;

        println!();
        println!(
            "{} {}",
            "Saved to".green().bold(),
            output_path.display().to_string().white()
        );
    }

    Ok(())
}

fn print_attempts(result: &AnalysisResult) {
    println!("{}", "Strategies:".yellow().bold());
    for attempt in &result.outcome.attempts {
        let status = match &attempt.status {
            AttemptStatus::Succeeded => attempt.status.label().green().bold(),
            AttemptStatus::NoKeyFound => attempt.status.label().white(),
            AttemptStatus::Declined { .. } => attempt.status.label().dimmed(),
            AttemptStatus::BudgetExceeded { .. } => attempt.status.label().yellow(),
        };
        let detail = match &attempt.status {
            AttemptStatus::Declined { reason } => format!(" ({})", reason),
            AttemptStatus::BudgetExceeded { limit } => format!(" ({})", limit),
            _ => String::new(),
        };
        println!(
            "  {:<11} {}{}  [{} tested, {} cached, {} pruned, {} ms]",
            attempt.strategy_name(),
            status,
            detail.dimmed(),
            attempt.stats.combinations_tested,
            attempt.stats.cache_hits,
            attempt.stats.pruned,
            attempt.stats.elapsed_ms
        );
    }
}

fn print_keys(result: &AnalysisResult) {
    let outcome = &result.outcome;
    match outcome.winning_strategy {
        Some(strategy) => {
            println!(
                "{} {} (found by {})",
                "Minimal keys:".green().bold(),
                outcome.minimal_keys.len().to_string().white().bold(),
                strategy.as_str().cyan()
            );
            for key in &outcome.minimal_keys {
                if key.is_empty() {
                    println!("  {} {}", "•".dimmed(), "(no columns needed)".dimmed());
                } else {
                    println!("  {} {}", "•".dimmed(), key.to_string().white().bold());
                }
            }
        }
        None => {
            println!(
                "{} no combination of up to {} columns identifies every row",
                "No key:".red().bold(),
                result.config.max_key_length
            );
        }
    }
}
