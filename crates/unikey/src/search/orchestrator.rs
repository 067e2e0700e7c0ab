//! Sequencing of search tiers for one dataset.
//!
//! The orchestrator walks the configured strategy order, stopping at the
//! first tier that reports keys. Every attempt's result is kept, so the
//! outcome carries the trace of each declined, aborted or failed tier ahead
//! of the winner.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::combo::ColumnCombo;
use super::config::{SearchConfig, StrategyKind};
use super::context::SearchContext;
use super::oracle::OracleStats;
use super::probe::{DependencyProbe, UnavailableProbe};
use super::strategy::{KeySearch, Strategy};
use super::trace::{AttemptStatus, StrategyResult, TraceEntry};
use crate::error::Result;
use crate::input::Dataset;
use crate::profile::ColumnProfile;

/// Lifecycle of one orchestrated search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OrchestratorState {
    /// Nothing attempted yet.
    Pending,
    /// Running the strategy at `index` of the configured order.
    Trying { index: usize, strategy: StrategyKind },
    /// A strategy reported keys.
    Succeeded { strategy: StrategyKind },
    /// Every configured strategy ran without keys.
    Exhausted,
}

impl OrchestratorState {
    /// Whether the search has finished.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestratorState::Succeeded { .. } | OrchestratorState::Exhausted
        )
    }
}

/// Result of searching one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Tier whose keys were accepted; `None` when exhausted.
    pub winning_strategy: Option<StrategyKind>,
    /// Keys from the winning tier, shortest first.
    pub minimal_keys: Vec<ColumnCombo>,
    /// Every attempt in the order it ran.
    pub attempts: Vec<StrategyResult>,
    pub profiles: Vec<ColumnProfile>,
    pub row_count: usize,
    pub column_count: usize,
    pub state: OrchestratorState,
    /// Oracle work across all attempts.
    pub oracle: OracleStats,
}

impl SearchOutcome {
    /// Whether any tier found keys.
    pub fn success(&self) -> bool {
        self.winning_strategy.is_some()
    }

    /// The winning attempt, if any.
    pub fn winning_attempt(&self) -> Option<&StrategyResult> {
        self.attempts.iter().find(|a| a.success())
    }

    /// Every trace entry of every attempt, in attempt order.
    pub fn full_trace(&self) -> impl Iterator<Item = &TraceEntry> {
        self.attempts.iter().flat_map(|a| a.trace.iter())
    }

    /// Keys as column-name lists.
    pub fn key_names(&self) -> Vec<Vec<String>> {
        self.minimal_keys.iter().map(|k| k.names().to_vec()).collect()
    }
}

/// Runs the configured tiers against datasets.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: SearchConfig,
    strategies: Vec<Strategy>,
}

impl Orchestrator {
    /// Create an orchestrator with the default (unavailable) probe.
    pub fn new(config: SearchConfig) -> Result<Self> {
        Self::with_probe(config, Arc::new(UnavailableProbe))
    }

    /// Create an orchestrator whose probe tier wraps `probe`.
    pub fn with_probe(config: SearchConfig, probe: Arc<dyn DependencyProbe>) -> Result<Self> {
        config.validate()?;
        let strategies = config
            .strategy_order
            .iter()
            .map(|&kind| Strategy::for_kind(kind, &probe))
            .collect();
        Ok(Self { config, strategies })
    }

    /// The configuration in use.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Tiers in the order they will run.
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Search one dataset.
    ///
    /// An invalid dataset is an error and no tier runs. Finding no key is
    /// not an error: the outcome's state is `Exhausted`.
    pub fn search(&self, dataset: &Dataset) -> Result<SearchOutcome> {
        dataset.validate()?;

        let mut ctx = SearchContext::new(dataset, &self.config);
        let mut state = OrchestratorState::Pending;
        let mut attempts = Vec::with_capacity(self.strategies.len());

        info!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            order = ?self.config.strategy_order,
            "starting key search"
        );

        for (index, strategy) in self.strategies.iter().enumerate() {
            let kind = strategy.kind();
            state = transition(state, OrchestratorState::Trying { index, strategy: kind });

            let result = strategy.attempt(&mut ctx);
            log_attempt(&result);
            let won = result.success();
            attempts.push(result);

            if won {
                state = transition(state, OrchestratorState::Succeeded { strategy: kind });
                break;
            }
        }

        if !state.is_terminal() {
            state = transition(state, OrchestratorState::Exhausted);
        }

        let minimal_keys = attempts
            .iter()
            .find(|a| a.success())
            .map(|a| a.minimal_keys.clone())
            .unwrap_or_default();
        let winning_strategy = match state {
            OrchestratorState::Succeeded { strategy } => Some(strategy),
            _ => None,
        };

        match winning_strategy {
            Some(strategy) => info!(
                strategy = %strategy,
                keys = ?minimal_keys.iter().map(ColumnCombo::signature).collect::<Vec<_>>(),
                "key search succeeded"
            ),
            None => warn!(
                max_key_length = self.config.max_key_length,
                "no unique key found by any strategy"
            ),
        }

        Ok(SearchOutcome {
            winning_strategy,
            minimal_keys,
            attempts,
            profiles: ctx.profiles().to_vec(),
            row_count: dataset.row_count(),
            column_count: dataset.column_count(),
            state,
            oracle: ctx.oracle_stats(),
        })
    }
}

fn transition(from: OrchestratorState, to: OrchestratorState) -> OrchestratorState {
    debug!(from = ?from, to = ?to, "orchestrator transition");
    to
}

fn log_attempt(result: &StrategyResult) {
    match &result.status {
        AttemptStatus::Succeeded => info!(
            strategy = %result.strategy,
            keys = result.minimal_keys.len(),
            tested = result.stats.combinations_tested,
            "strategy succeeded"
        ),
        AttemptStatus::NoKeyFound => info!(
            strategy = %result.strategy,
            tested = result.stats.combinations_tested,
            "strategy found no key, falling through"
        ),
        AttemptStatus::Declined { reason } => info!(
            strategy = %result.strategy,
            reason = %reason,
            "strategy declined, falling through"
        ),
        AttemptStatus::BudgetExceeded { limit } => warn!(
            strategy = %result.strategy,
            limit = %limit,
            "strategy budget exceeded, falling through"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::config::Budget;
    use crate::search::probe::{DiscoveryProbe, FunctionalDependency, MockDiscovery};
    use crate::search::trace::TraceOutcome;

    fn scenario_b() -> Dataset {
        Dataset::from_strings(
            &["a", "b"],
            &[
                vec!["1", "1"],
                vec!["1", "2"],
                vec!["2", "1"],
                vec!["2", "2"],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_falls_through_declined_probe() {
        let ds = Dataset::from_strings(
            &["id", "name"],
            &[vec!["1", "x"], vec!["2", "x"], vec!["3", "y"]],
        )
        .unwrap();
        let outcome = Orchestrator::new(SearchConfig::default())
            .unwrap()
            .search(&ds)
            .unwrap();

        assert_eq!(outcome.winning_strategy, Some(StrategyKind::Linear));
        assert_eq!(outcome.attempts.len(), 2);
        assert!(matches!(
            outcome.attempts[0].status,
            AttemptStatus::Declined { .. }
        ));
        let first = outcome.full_trace().next().unwrap();
        assert!(matches!(first.outcome, TraceOutcome::Declined { .. }));
        assert_eq!(
            outcome.state,
            OrchestratorState::Succeeded {
                strategy: StrategyKind::Linear
            }
        );
    }

    #[test]
    fn test_probe_wins_when_available() {
        let engine = MockDiscovery::with_dependencies(vec![FunctionalDependency::new(
            &["a", "b"],
            &[],
        )]);
        let orchestrator = Orchestrator::with_probe(
            SearchConfig::default(),
            Arc::new(DiscoveryProbe::new(engine)),
        )
        .unwrap();
        let outcome = orchestrator.search(&scenario_b()).unwrap();

        assert_eq!(outcome.winning_strategy, Some(StrategyKind::Probe));
        assert_eq!(
            outcome.key_names(),
            vec![vec!["a".to_string(), "b".to_string()]]
        );
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[test]
    fn test_budget_abort_falls_through() {
        let config = SearchConfig::default()
            .with_strategy_order(vec![StrategyKind::Smart, StrategyKind::Exhaustive])
            .with_budget(StrategyKind::Smart, Budget::unlimited().with_max_combinations(1));
        let outcome = Orchestrator::new(config)
            .unwrap()
            .search(&scenario_b())
            .unwrap();

        assert!(matches!(
            outcome.attempts[0].status,
            AttemptStatus::BudgetExceeded { .. }
        ));
        assert_eq!(outcome.winning_strategy, Some(StrategyKind::Exhaustive));
        // exhaustive reuses the empty-combo verdict from the smart attempt
        assert!(outcome.attempts[1].trace.entries()[0].cached);
    }

    #[test]
    fn test_exhausted_is_not_an_error() {
        let ds = Dataset::from_strings(&["a", "b"], &[vec!["1", "2"], vec!["1", "2"]]).unwrap();
        let config = SearchConfig::default().with_max_key_length(3);
        let outcome = Orchestrator::new(config).unwrap().search(&ds).unwrap();

        assert_eq!(outcome.state, OrchestratorState::Exhausted);
        assert!(outcome.winning_strategy.is_none());
        assert!(outcome.minimal_keys.is_empty());
        assert_eq!(outcome.attempts.len(), 4);
        assert_eq!(
            outcome.attempts.last().unwrap().status,
            AttemptStatus::NoKeyFound
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SearchConfig::default().with_max_key_length(0);
        assert!(Orchestrator::new(config).is_err());
    }

    #[test]
    fn test_invalid_dataset_rejected_before_any_tier() {
        let ds: Dataset =
            serde_json::from_str(r#"{"columns": ["a", "a"], "rows": [["x", "y"]]}"#).unwrap();
        let err = Orchestrator::new(SearchConfig::default())
            .unwrap()
            .search(&ds)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate column name"));
    }
}
