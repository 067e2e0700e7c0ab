//! The closed set of search tiers.

use std::sync::Arc;

use super::apriori::AprioriSearch;
use super::config::StrategyKind;
use super::context::SearchContext;
use super::exhaustive::ExhaustiveSearch;
use super::linear::LinearSearch;
use super::probe::{DependencyProbe, ProbeSearch};
use super::trace::StrategyResult;

/// One attempt at finding keys.
pub trait KeySearch {
    /// Which tier this is.
    fn kind(&self) -> StrategyKind;

    /// Run against the context's dataset. Never fails: declines, budget
    /// aborts and negative results are all reported in the result.
    fn attempt(&self, ctx: &mut SearchContext<'_>) -> StrategyResult;
}

/// A configured search tier.
#[derive(Debug, Clone)]
pub enum Strategy {
    Probe(ProbeSearch),
    Linear(LinearSearch),
    Smart(AprioriSearch),
    Exhaustive(ExhaustiveSearch),
}

impl Strategy {
    /// Build the tier for `kind`; the probe tier wraps `probe`.
    pub fn for_kind(kind: StrategyKind, probe: &Arc<dyn DependencyProbe>) -> Self {
        match kind {
            StrategyKind::Probe => Strategy::Probe(ProbeSearch::new(Arc::clone(probe))),
            StrategyKind::Linear => Strategy::Linear(LinearSearch::new()),
            StrategyKind::Smart => Strategy::Smart(AprioriSearch::new()),
            StrategyKind::Exhaustive => Strategy::Exhaustive(ExhaustiveSearch::new()),
        }
    }
}

impl KeySearch for Strategy {
    fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Probe(s) => s.kind(),
            Strategy::Linear(s) => s.kind(),
            Strategy::Smart(s) => s.kind(),
            Strategy::Exhaustive(s) => s.kind(),
        }
    }

    fn attempt(&self, ctx: &mut SearchContext<'_>) -> StrategyResult {
        match self {
            Strategy::Probe(s) => s.attempt(ctx),
            Strategy::Linear(s) => s.attempt(ctx),
            Strategy::Smart(s) => s.attempt(ctx),
            Strategy::Exhaustive(s) => s.attempt(ctx),
        }
    }
}
