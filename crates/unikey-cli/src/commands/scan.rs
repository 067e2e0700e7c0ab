//! Scan command - discover keys for every eligible file in a directory.

use std::path::PathBuf;

use colored::Colorize;
use unikey::{report_path_for, DirectoryScanner, KeyFinder};

use crate::cli::SearchArgs;

pub fn run(
    dir: PathBuf,
    exclude: String,
    jobs: Option<usize>,
    search: SearchArgs,
    no_save: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("Directory not found: {}", dir.display()).into());
    }

    let config = search.to_config()?;
    let scanner = DirectoryScanner::new(&dir).with_exclude(&exclude)?;
    let files = scanner.files()?;

    if files.is_empty() {
        println!(
            "{} No eligible files in {}",
            "Note:".yellow(),
            dir.display()
        );
        return Ok(());
    }

    println!(
        "{} {} file(s) in {}",
        "Scanning".cyan().bold(),
        files.len().to_string().white().bold(),
        dir.display().to_string().white()
    );

    let finder = KeyFinder::with_config(config);
    let results = match jobs {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()?
            .install(|| finder.analyze_many(&files)),
        None => finder.analyze_many(&files),
    };

    println!();
    let mut with_key = 0;
    let mut without_key = 0;
    let mut failed = 0;
    for (path, result) in files.iter().zip(results) {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let result = match result {
            Ok(r) => r,
            Err(e) => {
                failed += 1;
                println!("  {} {:30} {}", "✗".red(), name, e.to_string().red());
                continue;
            }
        };

        let keys = result
            .outcome
            .minimal_keys
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        match result.outcome.winning_strategy {
            Some(strategy) => {
                with_key += 1;
                println!(
                    "  {} {:30} {:<11} {}",
                    "✓".green(),
                    name,
                    strategy.as_str().cyan(),
                    keys.white().bold()
                );
            }
            None => {
                without_key += 1;
                println!("  {} {:30} {}", "-".yellow(), name, "no key".yellow());
            }
        }

        if verbose {
            for attempt in &result.outcome.attempts {
                println!(
                    "      {:<11} {} ({} tested)",
                    attempt.strategy_name().dimmed(),
                    attempt.status.label().dimmed(),
                    attempt.stats.combinations_tested
                );
            }
        }

        if !no_save {
            let report = report_path_for(path);
            if let Err(e) = result.save(&report) {
                println!("      {} {}", "Not saved:".red(), e);
            }
        }
    }

    println!();
    println!(
        "{} {} with key, {} without, {} failed",
        "Summary:".yellow().bold(),
        with_key.to_string().green(),
        without_key.to_string().white(),
        failed.to_string().red()
    );

    Ok(())
}
