//! Persistence and rendering of analysis reports.

use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::error::{Result, UnikeyError};
use crate::finder::AnalysisResult;
use crate::profile::heuristic_order;
use crate::search::{AttemptStatus, TraceOutcome};

/// Suffix appended to a data file's stem to name its report.
pub const REPORT_SUFFIX: &str = "_uniquekey_report.json";

/// Default report location for a data file: `<dir>/<stem>_uniquekey_report.json`.
pub fn report_path_for(data_path: impl AsRef<Path>) -> PathBuf {
    let data_path = data_path.as_ref();
    let stem = data_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    data_path.with_file_name(format!("{}{}", stem, REPORT_SUFFIX))
}

impl AnalysisResult {
    /// Save the result as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    UnikeyError::Persistence(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file = File::create(path).map_err(|e| {
            UnikeyError::Persistence(format!(
                "Failed to create file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self).map_err(|e| {
            UnikeyError::Persistence(format!("Failed to serialize report: {}", e))
        })?;

        Ok(())
    }

    /// Load a result saved with [`AnalysisResult::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let file = File::open(path).map_err(|e| {
            UnikeyError::Persistence(format!(
                "Failed to open file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| {
            UnikeyError::Persistence(format!(
                "Failed to parse report '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

/// Render a result as plain text.
///
/// With `include_trace` every tested combination is listed under its
/// attempt, in the order it was generated.
pub fn render_text(result: &AnalysisResult, include_trace: bool) -> String {
    let outcome = &result.outcome;
    let mut out = String::new();

    let _ = writeln!(out, "File:     {}", result.source.path.display());
    let _ = writeln!(
        out,
        "Shape:    {} rows x {} columns",
        outcome.row_count, outcome.column_count
    );
    let _ = writeln!(out, "Hash:     {}", result.source.hash);
    let _ = writeln!(
        out,
        "Analyzed: {}",
        result.source.analyzed_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Columns (by uniqueness):");
    for p in &heuristic_order(&outcome.profiles) {
        let _ = writeln!(
            out,
            "  {:<24} {:>8} distinct  {:>6.1}%  {} null",
            p.name,
            p.distinct_count,
            p.uniqueness_ratio * 100.0,
            p.null_count
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Attempts:");
    for attempt in &outcome.attempts {
        let detail = match &attempt.status {
            AttemptStatus::Declined { reason } => format!(" ({})", reason),
            AttemptStatus::BudgetExceeded { limit } => format!(" ({})", limit),
            _ => String::new(),
        };
        let _ = writeln!(
            out,
            "  {:<11} {}{}  [{} tested, {} cached, {} pruned, {} ms]",
            attempt.strategy_name(),
            attempt.status.label(),
            detail,
            attempt.stats.combinations_tested,
            attempt.stats.cache_hits,
            attempt.stats.pruned,
            attempt.stats.elapsed_ms
        );

        if include_trace {
            for entry in &attempt.trace {
                let outcome_text = match &entry.outcome {
                    TraceOutcome::NotUnique {
                        first_row,
                        second_row,
                    } => format!("not unique (rows {} and {})", first_row, second_row),
                    TraceOutcome::Fault { message } => format!("fault: {}", message),
                    other => other.label().to_string(),
                };
                let _ = writeln!(
                    out,
                    "      L{}#{:<4} [{}] {}{}",
                    entry.level,
                    entry.index,
                    entry.columns.join(", "),
                    outcome_text,
                    if entry.cached { " (cached)" } else { "" }
                );
            }
        }
    }
    let _ = writeln!(out);

    match outcome.winning_strategy {
        Some(strategy) => {
            let _ = writeln!(out, "Minimal keys (found by {}):", strategy);
            for key in &outcome.minimal_keys {
                let _ = writeln!(out, "  {}", key);
            }
        }
        None => {
            let _ = writeln!(
                out,
                "No unique key of up to {} columns was found.",
                result.config.max_key_length
            );
        }
    }

    out
}
