//! Greedy single-pass key search.
//!
//! Columns are appended in heuristic order until the accumulator is unique,
//! then the accumulator is shrunk to a fixed point. Cheap, but it can miss
//! keys made of two low-ratio columns that never meet in the greedy order.

use tracing::info;

use super::combo::ColumnCombo;
use super::config::StrategyKind;
use super::context::{Attempt, BudgetExhausted, SearchContext};
use super::strategy::KeySearch;
use super::trace::StrategyResult;

/// The linear heuristic tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearSearch;

impl LinearSearch {
    pub fn new() -> Self {
        Self
    }

    fn run(
        &self,
        ctx: &mut SearchContext<'_>,
        attempt: &mut Attempt,
    ) -> Result<Option<Vec<usize>>, BudgetExhausted> {
        if attempt.test(ctx, &ColumnCombo::empty())? {
            return Ok(Some(Vec::new()));
        }

        let max_len = ctx.config().max_key_length;
        let order = ctx.heuristic_order().to_vec();
        let mut accumulator: Vec<usize> = Vec::new();
        let mut found = false;

        for position in order {
            if accumulator.len() >= max_len {
                break;
            }
            accumulator.push(position);
            let combo = ctx.combo(&accumulator);
            if attempt.test(ctx, &combo)? {
                found = true;
                break;
            }
        }

        if !found {
            return Ok(None);
        }

        // Shrink in reverse insertion order until no single removal keeps
        // the accumulator unique.
        loop {
            let mut changed = false;
            for position in accumulator.clone().into_iter().rev() {
                let candidate: Vec<usize> = accumulator
                    .iter()
                    .copied()
                    .filter(|&p| p != position)
                    .collect();
                let combo = ctx.combo(&candidate);
                if attempt.test(ctx, &combo)? {
                    accumulator = candidate;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        Ok(Some(accumulator))
    }
}

impl KeySearch for LinearSearch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Linear
    }

    fn attempt(&self, ctx: &mut SearchContext<'_>) -> StrategyResult {
        let mut attempt = ctx.begin(StrategyKind::Linear);

        match self.run(ctx, &mut attempt) {
            Ok(Some(positions)) => {
                let key = ctx.combo(&positions);
                info!(key = %key, "linear search found a key");
                attempt.finish_with_keys(vec![key])
            }
            Ok(None) => {
                info!(
                    max_key_length = ctx.config().max_key_length,
                    "linear search found no unique accumulator"
                );
                attempt.finish_with_keys(Vec::new())
            }
            Err(exhausted) => attempt.finish_exceeded(exhausted),
        }
    }
}
