//! Error types for the unikey library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for unikey operations.
///
/// Strategy declines, budget aborts and "no key found" are not errors: they
/// are reported through [`crate::search::AttemptStatus`] and the orchestrator
/// state of a [`crate::search::SearchOutcome`].
#[derive(Debug, Error)]
pub enum UnikeyError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error from the CSV library.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file or no data to analyze.
    #[error("Empty data: {0}")]
    EmptyData(String),

    /// The dataset violates a structural invariant (columns, row widths).
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regex compilation error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Error raised by a functional-dependency discovery engine.
    #[error("Discovery engine error: {0}")]
    Engine(String),

    /// Error saving or loading a report.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Result type alias for unikey operations.
pub type Result<T> = std::result::Result<T, UnikeyError>;
