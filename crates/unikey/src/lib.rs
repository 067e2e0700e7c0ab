//! unikey: minimal candidate-key discovery for schema-unknown tabular data.
//!
//! Given a table whose schema nobody wrote down, unikey finds the smallest
//! column combinations that identify every row. Search runs in tiers, each
//! cheaper tier getting the first chance:
//!
//! - **probe**: an external functional-dependency engine, when one is plugged in
//! - **linear**: a greedy accumulator over columns ordered by uniqueness
//! - **smart**: a level-wise Apriori search with frontier pruning
//! - **exhaustive**: level-wise brute force within the length bound
//!
//! The first tier that produces keys wins. Every combination any tier tests
//! is recorded in a trace, and the traces of the tiers that lost are kept.
//!
//! # Example
//!
//! ```no_run
//! use unikey::KeyFinder;
//!
//! let finder = KeyFinder::new();
//! let result = finder.analyze("orders.csv").unwrap();
//!
//! for key in &result.outcome.minimal_keys {
//!     println!("key: {}", key);
//! }
//! ```

pub mod error;
pub mod input;
pub mod profile;
pub mod report;
pub mod search;

mod finder;

pub use crate::finder::{AnalysisResult, KeyFinder};
pub use error::{Result, UnikeyError};
pub use input::{Dataset, DirectoryScanner, Loader, LoaderConfig, SourceMetadata, Value};
pub use profile::ColumnProfile;
pub use report::report_path_for;
pub use search::{
    ColumnCombo, DependencyProbe, LevelPolicy, Orchestrator, OrchestratorState, SearchConfig,
    SearchOutcome, StrategyKind, StrategyResult,
};
