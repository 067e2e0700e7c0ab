//! Main KeyFinder struct and public API.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, UnikeyError};
use crate::input::{Dataset, Loader, LoaderConfig, SourceMetadata};
use crate::search::{
    DependencyProbe, Orchestrator, SearchConfig, SearchOutcome, UnavailableProbe,
};

/// Result of analyzing one data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Metadata about the source file.
    pub source: SourceMetadata,
    /// Configuration the search ran with.
    pub config: SearchConfig,
    /// Search outcome with every attempt's trace.
    pub outcome: SearchOutcome,
}

impl AnalysisResult {
    /// One-line description of the result.
    pub fn summary(&self) -> String {
        match self.outcome.winning_strategy {
            Some(strategy) => format!(
                "{}: {} key(s) found by {} ({} rows, {} columns)",
                self.source.file,
                self.outcome.minimal_keys.len(),
                strategy,
                self.outcome.row_count,
                self.outcome.column_count
            ),
            None => format!(
                "{}: no unique key within {} columns ({} rows, {} columns)",
                self.source.file,
                self.config.max_key_length,
                self.outcome.row_count,
                self.outcome.column_count
            ),
        }
    }
}

/// The main key discovery engine.
pub struct KeyFinder {
    config: SearchConfig,
    loader: Loader,
    probe: Arc<dyn DependencyProbe>,
}

impl KeyFinder {
    /// Create a KeyFinder with default configuration and no probe engine.
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    /// Create a KeyFinder with a custom search configuration.
    pub fn with_config(config: SearchConfig) -> Self {
        Self {
            config,
            loader: Loader::new(),
            probe: Arc::new(UnavailableProbe),
        }
    }

    /// Use a custom loader configuration for [`KeyFinder::analyze`].
    pub fn with_loader_config(mut self, config: LoaderConfig) -> Self {
        self.loader = Loader::with_config(config);
        self
    }

    /// Plug in a dependency probe for the probe tier.
    pub fn with_probe(mut self, probe: impl DependencyProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// The search configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn orchestrator(&self) -> Result<Orchestrator> {
        Orchestrator::with_probe(self.config.clone(), Arc::clone(&self.probe))
    }

    /// Search one in-memory dataset.
    pub fn search(&self, dataset: &Dataset) -> Result<SearchOutcome> {
        self.orchestrator()?.search(dataset)
    }

    /// Search independent datasets in parallel, results in input order.
    pub fn search_many(&self, datasets: &[Dataset]) -> Vec<Result<SearchOutcome>> {
        let orchestrator = match self.orchestrator() {
            Ok(o) => o,
            Err(e) => {
                let message = e.to_string();
                return datasets
                    .iter()
                    .map(|_| Err(UnikeyError::Config(message.clone())))
                    .collect();
            }
        };
        datasets
            .par_iter()
            .map(|dataset| orchestrator.search(dataset))
            .collect()
    }

    /// Load a file and search it.
    pub fn analyze(&self, path: impl AsRef<Path>) -> Result<AnalysisResult> {
        let path = path.as_ref();
        let orchestrator = self.orchestrator()?;
        let (dataset, source) = self.loader.load(path)?;
        info!(file = %source.file, rows = source.row_count, "analyzing file");

        let outcome = orchestrator.search(&dataset)?;
        Ok(AnalysisResult {
            source,
            config: self.config.clone(),
            outcome,
        })
    }

    /// Analyze several files in parallel, results in input order.
    pub fn analyze_many(&self, paths: &[PathBuf]) -> Vec<Result<AnalysisResult>> {
        paths.par_iter().map(|path| self.analyze(path)).collect()
    }
}

impl Default for KeyFinder {
    fn default() -> Self {
        Self::new()
    }
}
