//! Per-dataset search state and the attempt recorder shared by all tiers.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::budget::BudgetTracker;
use super::combo::{minimal_key_set, ColumnCombo};
use super::config::{SearchConfig, StrategyKind};
use super::oracle::{OracleStats, UniquenessOracle};
use super::trace::{
    AttemptStats, AttemptStatus, SearchTrace, StrategyResult, TraceEntry, TraceOutcome,
};
use crate::input::Dataset;
use crate::profile::{heuristic_order, profile_columns, ColumnProfile};

/// Combos evaluated per chunk when parallel evaluation is on.
const PARALLEL_CHUNK: usize = 256;

/// Everything one dataset's run carries between strategies.
///
/// The oracle memo lives here, so later tiers reuse verdicts computed by
/// earlier ones.
pub struct SearchContext<'a> {
    dataset: &'a Dataset,
    config: &'a SearchConfig,
    oracle: UniquenessOracle<'a>,
    profiles: Vec<ColumnProfile>,
    ranked: Vec<usize>,
}

impl<'a> SearchContext<'a> {
    /// Profile the dataset and set up an empty oracle memo.
    pub fn new(dataset: &'a Dataset, config: &'a SearchConfig) -> Self {
        let profiles = profile_columns(dataset);
        let ranked = heuristic_order(&profiles)
            .into_iter()
            .map(|p| p.position)
            .collect();

        Self {
            dataset,
            config,
            oracle: UniquenessOracle::new(dataset),
            profiles,
            ranked,
        }
    }

    /// The dataset under search.
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// The run's configuration.
    pub fn config(&self) -> &'a SearchConfig {
        self.config
    }

    /// Column profiles in declared order.
    pub fn profiles(&self) -> &[ColumnProfile] {
        &self.profiles
    }

    /// Column positions by descending uniqueness ratio, ties by position.
    pub fn heuristic_order(&self) -> &[usize] {
        &self.ranked
    }

    /// The shared oracle.
    pub fn oracle(&mut self) -> &mut UniquenessOracle<'a> {
        &mut self.oracle
    }

    /// Oracle counters for the whole run.
    pub fn oracle_stats(&self) -> OracleStats {
        self.oracle.stats()
    }

    /// Build a combo from positions known to be in range.
    pub fn combo(&self, positions: &[usize]) -> ColumnCombo {
        ColumnCombo::from_valid_positions(self.dataset, positions)
    }

    /// Open an attempt for `kind` with its configured budget.
    pub(crate) fn begin(&self, kind: StrategyKind) -> Attempt {
        Attempt::new(kind, BudgetTracker::start(self.config.budget_for(kind)))
    }
}

/// Marker returned when an attempt's budget ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BudgetExhausted {
    pub limit: String,
}

/// Records one strategy attempt: trace, counters and budget.
pub(crate) struct Attempt {
    kind: StrategyKind,
    budget: BudgetTracker,
    trace: SearchTrace,
    level_index: BTreeMap<usize, usize>,
    stats: AttemptStats,
}

impl Attempt {
    fn new(kind: StrategyKind, budget: BudgetTracker) -> Self {
        Self {
            kind,
            budget,
            trace: SearchTrace::new(),
            level_index: BTreeMap::new(),
            stats: AttemptStats::default(),
        }
    }

    /// Count a candidate skipped without testing.
    pub fn prune(&mut self) {
        self.stats.pruned += 1;
    }

    /// Test a single combo. A fault counts as "not unique".
    pub fn test(
        &mut self,
        ctx: &mut SearchContext<'_>,
        combo: &ColumnCombo,
    ) -> Result<bool, BudgetExhausted> {
        let verdicts = self.test_all(ctx, std::slice::from_ref(combo))?;
        Ok(verdicts[0])
    }

    /// Test a generated batch in order, honouring the budget.
    ///
    /// Verdicts come back in input order. On budget exhaustion the untested
    /// combo is traced as `BudgetExceeded` and nothing after it is touched.
    pub fn test_all(
        &mut self,
        ctx: &mut SearchContext<'_>,
        combos: &[ColumnCombo],
    ) -> Result<Vec<bool>, BudgetExhausted> {
        let parallel = ctx.config.parallel;
        let chunk_size = if parallel { PARALLEL_CHUNK } else { 1 };
        let mut results = Vec::with_capacity(combos.len());

        for chunk in combos.chunks(chunk_size) {
            let granted = match self.budget.allowance(chunk.len()) {
                Ok(n) => n,
                Err(limit) => return Err(self.exceed(&chunk[0], limit)),
            };

            let granted_combos = &chunk[..granted];
            let cached: Vec<bool> = granted_combos
                .iter()
                .map(|c| ctx.oracle.is_cached(c))
                .collect();
            let verdicts = ctx.oracle.test_many(granted_combos, parallel);
            self.budget.charge(granted);

            for ((combo, verdict), was_cached) in granted_combos.iter().zip(&verdicts).zip(cached) {
                let outcome = TraceOutcome::from(verdict);
                self.stats.combinations_tested += 1;
                if was_cached {
                    self.stats.cache_hits += 1;
                }
                if matches!(outcome, TraceOutcome::Fault { .. }) {
                    self.stats.faults += 1;
                    warn!(strategy = %self.kind, combo = %combo, outcome = ?outcome, "combination fault");
                } else {
                    debug!(strategy = %self.kind, combo = %combo, outcome = outcome.label(), "tested");
                }
                results.push(outcome.is_unique());
                self.record(combo, outcome, was_cached);
            }

            if granted < chunk.len() {
                let limit = self.budget.exhausted_limit();
                return Err(self.exceed(&chunk[granted], limit));
            }
        }

        Ok(results)
    }

    fn exceed(&mut self, combo: &ColumnCombo, limit: String) -> BudgetExhausted {
        warn!(strategy = %self.kind, combo = %combo, limit = %limit, "budget exceeded, aborting strategy");
        self.record(
            combo,
            TraceOutcome::BudgetExceeded {
                limit: limit.clone(),
            },
            false,
        );
        BudgetExhausted { limit }
    }

    /// Append a trace entry tagged with its level and index within the level.
    pub fn record(&mut self, combo: &ColumnCombo, outcome: TraceOutcome, cached: bool) {
        let level = combo.len();
        let counter = self.level_index.entry(level).or_insert(0);
        let index = *counter;
        *counter += 1;

        self.trace.push(TraceEntry {
            strategy: self.kind,
            level,
            index,
            columns: combo.names().to_vec(),
            outcome,
            cached,
        });
    }

    /// Close the attempt with a key list; an empty list means no key.
    pub fn finish_with_keys(self, keys: Vec<ColumnCombo>) -> StrategyResult {
        if keys.is_empty() {
            self.finish(AttemptStatus::NoKeyFound, Vec::new())
        } else {
            self.finish(AttemptStatus::Succeeded, keys)
        }
    }

    /// Close the attempt after a budget abort.
    pub fn finish_exceeded(self, exhausted: BudgetExhausted) -> StrategyResult {
        self.finish(
            AttemptStatus::BudgetExceeded {
                limit: exhausted.limit,
            },
            Vec::new(),
        )
    }

    /// Close the attempt with an explicit status.
    pub fn finish(mut self, status: AttemptStatus, keys: Vec<ColumnCombo>) -> StrategyResult {
        self.stats.elapsed_ms = self.budget.elapsed_ms();
        let minimal_keys = match status {
            AttemptStatus::Succeeded => minimal_key_set(keys),
            _ => Vec::new(),
        };

        StrategyResult {
            strategy: self.kind,
            status,
            minimal_keys,
            trace: self.trace,
            stats: self.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::Budget;

    fn dataset() -> Dataset {
        Dataset::from_strings(
            &["a", "b", "c"],
            &[vec!["1", "x", "p"], vec!["2", "x", "p"], vec!["3", "y", "p"]],
        )
        .unwrap()
    }

    #[test]
    fn test_context_orders_columns() {
        let ds = dataset();
        let config = SearchConfig::default();
        let ctx = SearchContext::new(&ds, &config);
        assert_eq!(ctx.heuristic_order(), &[0, 1, 2]);
        assert_eq!(ctx.profiles().len(), 3);
    }

    #[test]
    fn test_attempt_traces_level_and_index() {
        let ds = dataset();
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(&ds, &config);
        let mut attempt = ctx.begin(StrategyKind::Exhaustive);

        let combos = vec![ctx.combo(&[1]), ctx.combo(&[2]), ctx.combo(&[1, 2])];
        let verdicts = attempt.test_all(&mut ctx, &combos).unwrap();
        assert_eq!(verdicts, vec![false, false, false]);
        let again = ctx.combo(&[1]);
        assert!(!attempt.test(&mut ctx, &again).unwrap());

        let result = attempt.finish_with_keys(Vec::new());
        let tags: Vec<_> = result
            .trace
            .iter()
            .map(|e| (e.level, e.index, e.cached))
            .collect();
        assert_eq!(tags, vec![(1, 0, false), (1, 1, false), (2, 0, false), (1, 2, true)]);
        assert_eq!(result.status, AttemptStatus::NoKeyFound);
        assert_eq!(result.stats.combinations_tested, 4);
        assert_eq!(result.stats.cache_hits, 1);
    }

    #[test]
    fn test_budget_abort_traces_untested_combo() {
        let ds = dataset();
        let config = SearchConfig::default()
            .with_budget(StrategyKind::Smart, Budget::unlimited().with_max_combinations(2));
        let mut ctx = SearchContext::new(&ds, &config);
        let mut attempt = ctx.begin(StrategyKind::Smart);

        let combos = vec![ctx.combo(&[1]), ctx.combo(&[2]), ctx.combo(&[0])];
        let exhausted = attempt.test_all(&mut ctx, &combos).unwrap_err();
        assert_eq!(exhausted.limit, "combination limit of 2");

        let result = attempt.finish_exceeded(exhausted);
        assert_eq!(result.trace.len(), 3);
        assert_eq!(
            result.trace.entries()[2].outcome,
            TraceOutcome::BudgetExceeded {
                limit: "combination limit of 2".into()
            }
        );
        assert_eq!(result.trace.entries()[2].columns, vec!["a"]);
        // the aborted combo was never evaluated
        assert_eq!(ctx.oracle_stats().evaluations, 2);
        assert!(!result.success());
    }

    #[test]
    fn test_parallel_chunks_respect_budget() {
        let ds = dataset();
        let config = SearchConfig::default()
            .with_parallel(true)
            .with_budget(StrategyKind::Exhaustive, Budget::unlimited().with_max_combinations(1));
        let mut ctx = SearchContext::new(&ds, &config);
        let mut attempt = ctx.begin(StrategyKind::Exhaustive);

        let combos = vec![ctx.combo(&[1]), ctx.combo(&[0])];
        assert!(attempt.test_all(&mut ctx, &combos).is_err());
        assert_eq!(ctx.oracle_stats().evaluations, 1);
    }
}
