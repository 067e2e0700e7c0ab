//! Adapter boundary to external functional-dependency discovery.
//!
//! A [`DependencyProbe`] either hands back candidate keys or reports that it
//! is unavailable. The probe tier never trusts those keys: each one is
//! verified with the oracle and shrunk to a minimal key before it is
//! reported.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::combo::{minimal_key_set, ColumnCombo};
use super::config::StrategyKind;
use super::context::{Attempt, BudgetExhausted, SearchContext};
use super::strategy::KeySearch;
use super::trace::{AttemptStatus, StrategyResult, TraceOutcome};
use crate::error::{Result, UnikeyError};
use crate::input::{Dataset, Value};

/// Text written in place of null cells when a dataset is handed to an engine.
pub const NULL_SENTINEL: &str = "[NULL]";

/// Why a probe could not produce keys.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum UnavailableReason {
    /// No discovery engine is installed.
    #[error("dependency discovery is not available")]
    CapabilityAbsent,
    /// The dataset cannot be expressed in the engine's input format.
    #[error("dataset is incompatible with the discovery engine: {0}")]
    FormatIncompatible(String),
    /// The engine ran and failed.
    #[error("discovery engine failed: {0}")]
    EngineFailed(String),
}

/// Result of one probe call.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    /// Candidate keys reported by the engine, not yet verified.
    Success(Vec<ColumnCombo>),
    /// The probe declined.
    Unavailable(UnavailableReason),
}

/// External key discovery capability.
pub trait DependencyProbe: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Discover candidate keys of `dataset` no longer than `max_key_length`.
    fn probe(&self, dataset: &Dataset, max_key_length: usize) -> ProbeOutcome;
}

/// The default probe: always reports the capability as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProbe;

impl DependencyProbe for UnavailableProbe {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn probe(&self, _dataset: &Dataset, _max_key_length: usize) -> ProbeOutcome {
        ProbeOutcome::Unavailable(UnavailableReason::CapabilityAbsent)
    }
}

/// A functional dependency `determinant -> dependents` over column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalDependency {
    pub determinant: Vec<String>,
    pub dependents: Vec<String>,
}

impl FunctionalDependency {
    pub fn new<S: AsRef<str>>(determinant: &[S], dependents: &[S]) -> Self {
        Self {
            determinant: determinant.iter().map(|s| s.as_ref().to_string()).collect(),
            dependents: dependents.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}

/// All-text copy of a dataset in the shape discovery engines expect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TextTable {
    /// Render every cell as text, nulls as [`NULL_SENTINEL`].
    ///
    /// A `NaN` float has no stable text identity and makes the dataset
    /// incompatible.
    pub fn from_dataset(dataset: &Dataset) -> std::result::Result<Self, UnavailableReason> {
        let mut rows = Vec::with_capacity(dataset.row_count());
        for (row_idx, row) in dataset.rows().iter().enumerate() {
            let mut cells = Vec::with_capacity(row.len());
            for (col_idx, value) in row.iter().enumerate() {
                let cell = match value {
                    Value::Null => NULL_SENTINEL.to_string(),
                    Value::Float(f) if f.is_nan() => {
                        return Err(UnavailableReason::FormatIncompatible(format!(
                            "NaN in column '{}' at row {}",
                            dataset.columns()[col_idx],
                            row_idx
                        )));
                    }
                    other => other.to_string(),
                };
                cells.push(cell);
            }
            rows.push(cells);
        }

        Ok(Self {
            columns: dataset.columns().to_vec(),
            rows,
        })
    }
}

/// A functional-dependency discovery engine.
pub trait FdDiscovery: Send + Sync {
    /// Engine name used in logs.
    fn name(&self) -> &str;

    /// Discover the dependencies of `table`, with determinants no longer
    /// than `max_determinant` where the engine supports such a bound.
    fn discover(&self, table: &TextTable, max_determinant: usize)
        -> Result<Vec<FunctionalDependency>>;
}

/// Probe backed by an [`FdDiscovery`] engine.
pub struct DiscoveryProbe<E: FdDiscovery> {
    engine: E,
}

impl<E: FdDiscovery> DiscoveryProbe<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

impl<E: FdDiscovery> DependencyProbe for DiscoveryProbe<E> {
    fn name(&self) -> &str {
        self.engine.name()
    }

    fn probe(&self, dataset: &Dataset, max_key_length: usize) -> ProbeOutcome {
        let table = match TextTable::from_dataset(dataset) {
            Ok(table) => table,
            Err(reason) => return ProbeOutcome::Unavailable(reason),
        };

        let dependencies = match self.engine.discover(&table, max_key_length) {
            Ok(deps) => deps,
            Err(e) => {
                return ProbeOutcome::Unavailable(UnavailableReason::EngineFailed(e.to_string()));
            }
        };

        match keys_from_dependencies(dataset, &dependencies) {
            Ok(keys) => ProbeOutcome::Success(keys),
            Err(e) => ProbeOutcome::Unavailable(UnavailableReason::EngineFailed(e.to_string())),
        }
    }
}

/// Derive minimal keys from a dependency list.
///
/// Dependencies sharing a determinant are merged. A determinant is a key
/// when it, together with its dependents, covers every column. Column names
/// the dataset does not have are an `Engine` error.
pub fn keys_from_dependencies(
    dataset: &Dataset,
    dependencies: &[FunctionalDependency],
) -> Result<Vec<ColumnCombo>> {
    let resolve = |name: &String| {
        dataset.column_position(name).ok_or_else(|| {
            UnikeyError::Engine(format!("dependency names unknown column '{}'", name))
        })
    };

    let mut closure: BTreeMap<BTreeSet<usize>, BTreeSet<usize>> = BTreeMap::new();
    for fd in dependencies {
        let determinant = fd.determinant.iter().map(resolve).collect::<Result<BTreeSet<_>>>()?;
        let dependents = fd.dependents.iter().map(resolve).collect::<Result<Vec<_>>>()?;
        let covered = closure
            .entry(determinant.clone())
            .or_insert_with(|| determinant.clone());
        covered.extend(dependents);
    }

    let all = dataset.column_count();
    let keys = closure
        .into_iter()
        .filter(|(_, covered)| covered.len() == all)
        .map(|(determinant, _)| {
            let positions: Vec<usize> = determinant.into_iter().collect();
            ColumnCombo::from_valid_positions(dataset, &positions)
        });

    Ok(minimal_key_set(keys))
}

/// Deterministic engine for tests: returns fixed dependencies or a fixed error.
#[derive(Debug, Clone, Default)]
pub struct MockDiscovery {
    dependencies: Vec<FunctionalDependency>,
    failure: Option<String>,
}

impl MockDiscovery {
    /// An engine reporting `dependencies` for any table.
    pub fn with_dependencies(dependencies: Vec<FunctionalDependency>) -> Self {
        Self {
            dependencies,
            failure: None,
        }
    }

    /// An engine that always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            dependencies: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

impl FdDiscovery for MockDiscovery {
    fn name(&self) -> &str {
        "mock"
    }

    fn discover(
        &self,
        _table: &TextTable,
        _max_determinant: usize,
    ) -> Result<Vec<FunctionalDependency>> {
        match &self.failure {
            Some(message) => Err(UnikeyError::Engine(message.clone())),
            None => Ok(self.dependencies.clone()),
        }
    }
}

/// The probe tier: one probe call, then oracle verification of each key.
#[derive(Clone)]
pub struct ProbeSearch {
    probe: Arc<dyn DependencyProbe>,
}

impl ProbeSearch {
    pub fn new(probe: Arc<dyn DependencyProbe>) -> Self {
        Self { probe }
    }

    /// Name of the wrapped probe.
    pub fn probe_name(&self) -> &str {
        self.probe.name()
    }

    /// Keep the engine keys that are unique, each shrunk to a minimal key.
    fn verify(
        &self,
        ctx: &mut SearchContext<'_>,
        attempt: &mut Attempt,
        candidates: Vec<ColumnCombo>,
    ) -> std::result::Result<Vec<ColumnCombo>, BudgetExhausted> {
        if attempt.test(ctx, &ColumnCombo::empty())? {
            return Ok(vec![ColumnCombo::empty()]);
        }

        let max_len = ctx.config().max_key_length;
        let mut verified = Vec::new();
        for key in candidates {
            if key.len() > max_len {
                warn!(key = %key, max_key_length = max_len, "probe key exceeds length bound, dropped");
                attempt.prune();
                continue;
            }
            if !attempt.test(ctx, &key)? {
                warn!(key = %key, "probe key failed verification, dropped");
                continue;
            }

            let minimal = shrink(ctx, attempt, key.clone())?;
            if minimal != key {
                warn!(reported = %key, minimal = %minimal, "probe key was not minimal, shrunk");
            }
            verified.push(minimal);
        }
        Ok(verified)
    }
}

/// Remove columns from a unique key, last position first, until no single
/// removal keeps it unique.
fn shrink(
    ctx: &mut SearchContext<'_>,
    attempt: &mut Attempt,
    mut key: ColumnCombo,
) -> std::result::Result<ColumnCombo, BudgetExhausted> {
    loop {
        let mut changed = false;
        for position in key.positions().to_vec().into_iter().rev() {
            let candidate = key.without(position);
            if attempt.test(ctx, &candidate)? {
                key = candidate;
                changed = true;
            }
        }
        if !changed {
            return Ok(key);
        }
    }
}

impl Default for ProbeSearch {
    fn default() -> Self {
        Self::new(Arc::new(UnavailableProbe))
    }
}

impl std::fmt::Debug for ProbeSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeSearch")
            .field("probe", &self.probe.name())
            .finish()
    }
}

impl KeySearch for ProbeSearch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Probe
    }

    fn attempt(&self, ctx: &mut SearchContext<'_>) -> StrategyResult {
        let mut attempt = ctx.begin(StrategyKind::Probe);
        let max_len = ctx.config().max_key_length;
        info!(probe = self.probe.name(), "running dependency probe");

        let candidates = match self.probe.probe(ctx.dataset(), max_len) {
            ProbeOutcome::Success(keys) => keys,
            ProbeOutcome::Unavailable(reason) => {
                let reason = reason.to_string();
                info!(probe = self.probe.name(), reason = %reason, "dependency probe declined");
                attempt.record(
                    &ColumnCombo::empty(),
                    TraceOutcome::Declined {
                        reason: reason.clone(),
                    },
                    false,
                );
                return attempt.finish(AttemptStatus::Declined { reason }, Vec::new());
            }
        };

        match self.verify(ctx, &mut attempt, candidates) {
            Ok(verified) => {
                if !verified.is_empty() {
                    info!(keys = verified.len(), "dependency probe keys verified");
                }
                attempt.finish_with_keys(verified)
            }
            Err(exhausted) => attempt.finish_exceeded(exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::SearchConfig;

    fn people() -> Dataset {
        Dataset::from_strings(
            &["id", "name", "city"],
            &[
                vec!["1", "ann", "oslo"],
                vec!["2", "bob", "oslo"],
                vec!["3", "ann", "rome"],
            ],
        )
        .unwrap()
    }

    fn run(ds: &Dataset, probe: impl DependencyProbe + 'static) -> StrategyResult {
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(ds, &config);
        ProbeSearch::new(Arc::new(probe)).attempt(&mut ctx)
    }

    #[test]
    fn test_unavailable_probe_declines_with_one_entry() {
        let ds = people();
        let result = run(&ds, UnavailableProbe);

        assert!(matches!(result.status, AttemptStatus::Declined { .. }));
        assert_eq!(result.trace.len(), 1);
        let entry = &result.trace.entries()[0];
        assert_eq!(entry.level, 0);
        assert!(entry.columns.is_empty());
        assert!(matches!(entry.outcome, TraceOutcome::Declined { .. }));
    }

    #[test]
    fn test_keys_from_dependencies_merges_and_minimizes() {
        let ds = people();
        let deps = vec![
            FunctionalDependency::new(&["id"], &["name"]),
            FunctionalDependency::new(&["id"], &["city"]),
            FunctionalDependency::new(&["name", "city"], &["id"]),
            FunctionalDependency::new(&["id", "name"], &["city"]),
            FunctionalDependency::new(&["city"], &["name"]),
        ];
        let keys = keys_from_dependencies(&ds, &deps).unwrap();
        let sigs: Vec<_> = keys.iter().map(|k| k.signature()).collect();
        assert_eq!(sigs, vec!["id", "name|city"]);
    }

    #[test]
    fn test_unknown_column_is_engine_error() {
        let ds = people();
        let deps = vec![FunctionalDependency::new(&["zip"], &["id"])];
        assert!(matches!(
            keys_from_dependencies(&ds, &deps),
            Err(UnikeyError::Engine(_))
        ));
    }

    #[test]
    fn test_discovery_probe_keys_are_verified() {
        let ds = people();
        // "city" is claimed to determine everything, which is false.
        let engine = MockDiscovery::with_dependencies(vec![
            FunctionalDependency::new(&["id"], &["name", "city"]),
            FunctionalDependency::new(&["city"], &["id", "name"]),
        ]);
        let result = run(&ds, DiscoveryProbe::new(engine));

        assert!(result.success());
        assert_eq!(result.key_names(), vec![vec!["id".to_string()]]);
        // empty combo, id, id shrunk to the (cached) empty combo, city
        let tested: Vec<_> = result.trace.iter().map(|e| e.columns.join("|")).collect();
        assert_eq!(tested, vec!["", "id", "", "city"]);
    }

    #[test]
    fn test_non_minimal_key_is_shrunk() {
        let ds = people();
        let engine = MockDiscovery::with_dependencies(vec![FunctionalDependency::new(
            &["id", "name"],
            &["city"],
        )]);
        let result = run(&ds, DiscoveryProbe::new(engine));

        assert_eq!(result.key_names(), vec![vec!["id".to_string()]]);
        let tested: Vec<_> = result.trace.iter().map(|e| e.columns.join("|")).collect();
        assert_eq!(tested, vec!["", "id|name", "id", "", ""]);
    }

    #[test]
    fn test_single_row_reports_empty_key() {
        let ds = Dataset::from_strings(&["a", "b"], &[vec!["1", "2"]]).unwrap();
        let engine =
            MockDiscovery::with_dependencies(vec![FunctionalDependency::new(&["a"], &["b"])]);
        let result = run(&ds, DiscoveryProbe::new(engine));

        assert!(result.success());
        assert_eq!(result.key_names(), vec![Vec::<String>::new()]);
        assert_eq!(result.trace.len(), 1);
    }

    #[test]
    fn test_engine_failure_declines() {
        let ds = people();
        let result = run(&ds, DiscoveryProbe::new(MockDiscovery::failing("out of memory")));
        match result.status {
            AttemptStatus::Declined { reason } => assert!(reason.contains("out of memory")),
            other => panic!("unexpected status {:?}", other),
        }
    }

    #[test]
    fn test_text_table_sentinels_and_nan() {
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![Value::Null, Value::Integer(3)]],
        )
        .unwrap();
        let table = TextTable::from_dataset(&ds).unwrap();
        assert_eq!(table.rows, vec![vec![NULL_SENTINEL.to_string(), "3".to_string()]]);

        let nan = Dataset::new(vec!["x".into()], vec![vec![Value::Float(f64::NAN)]]).unwrap();
        let probe = DiscoveryProbe::new(MockDiscovery::default());
        assert!(matches!(
            probe.probe(&nan, 5),
            ProbeOutcome::Unavailable(UnavailableReason::FormatIncompatible(_))
        ));
    }
}
