//! Multi-tier candidate-key search.
//!
//! Tiers, in default order:
//! - probe: external functional-dependency discovery behind [`DependencyProbe`]
//! - linear: greedy accumulator with fixed-point minimization
//! - smart: level-wise Apriori search over a pruned frontier
//! - exhaustive: level-wise brute force
//!
//! All tiers share one memoized [`UniquenessOracle`] per dataset through a
//! [`SearchContext`], and every test they perform is traced.

mod apriori;
mod budget;
mod combo;
mod config;
mod context;
mod exhaustive;
mod linear;
mod oracle;
mod orchestrator;
mod probe;
mod strategy;
mod trace;

pub use apriori::AprioriSearch;
pub use budget::BudgetTracker;
pub use combo::{minimal_key_set, ColumnCombo};
pub use config::{Budget, LevelPolicy, SearchConfig, StrategyKind, DEFAULT_MAX_KEY_LENGTH};
pub use context::SearchContext;
pub use exhaustive::ExhaustiveSearch;
pub use linear::LinearSearch;
pub use oracle::{ComboFault, OracleStats, Uniqueness, UniquenessOracle, Verdict};
pub use orchestrator::{Orchestrator, OrchestratorState, SearchOutcome};
pub use probe::{
    keys_from_dependencies, DependencyProbe, DiscoveryProbe, FdDiscovery, FunctionalDependency,
    MockDiscovery, ProbeOutcome, ProbeSearch, TextTable, UnavailableProbe, UnavailableReason,
    NULL_SENTINEL,
};
pub use strategy::{KeySearch, Strategy};
pub use trace::{
    AttemptStats, AttemptStatus, SearchTrace, StrategyResult, TraceEntry, TraceOutcome,
};
