//! Brute-force level-wise key search, the last resort.

use itertools::Itertools;
use tracing::{info, warn};

use super::combo::ColumnCombo;
use super::config::StrategyKind;
use super::context::{Attempt, BudgetExhausted, SearchContext};
use super::strategy::KeySearch;
use super::trace::StrategyResult;

/// Combos materialized at a time while walking one level.
const LEVEL_BATCH: usize = 4096;

/// The exhaustive tier.
///
/// Enumerates every combination of every length in lexicographic order of
/// column positions, skipping only supersets of keys already confirmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveSearch;

impl ExhaustiveSearch {
    pub fn new() -> Self {
        Self
    }

    fn run(
        &self,
        ctx: &mut SearchContext<'_>,
        attempt: &mut Attempt,
    ) -> Result<Vec<ColumnCombo>, BudgetExhausted> {
        if attempt.test(ctx, &ColumnCombo::empty())? {
            return Ok(vec![ColumnCombo::empty()]);
        }

        let columns = ctx.dataset().column_count();
        let max_len = ctx.config().max_key_length.min(columns);
        let mut keys: Vec<ColumnCombo> = Vec::new();

        for level in 1..=max_len {
            warn!(
                level,
                combinations = binomial(columns, level),
                "exhaustive search testing every combination of this length"
            );

            let level_keys_before = keys.len();
            for chunk in &(0..columns).combinations(level).chunks(LEVEL_BATCH) {
                let mut batch = Vec::with_capacity(LEVEL_BATCH);
                for positions in chunk {
                    let combo = ctx.combo(&positions);
                    if keys.iter().any(|k| k.is_subset_of(&combo)) {
                        attempt.prune();
                    } else {
                        batch.push(combo);
                    }
                }

                let verdicts = attempt.test_all(ctx, &batch)?;
                keys.extend(
                    batch
                        .into_iter()
                        .zip(verdicts)
                        .filter_map(|(combo, unique)| unique.then_some(combo)),
                );
            }

            if keys.len() > level_keys_before {
                info!(level, keys = keys.len(), "exhaustive search found keys");
                break;
            }
        }

        Ok(keys)
    }
}

/// `C(n, k)`, saturating at `u128::MAX`.
pub(crate) fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = match acc.checked_mul((n - i) as u128) {
            Some(v) => v / (i as u128 + 1),
            None => return u128::MAX,
        };
    }
    acc
}

impl KeySearch for ExhaustiveSearch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Exhaustive
    }

    fn attempt(&self, ctx: &mut SearchContext<'_>) -> StrategyResult {
        let mut attempt = ctx.begin(StrategyKind::Exhaustive);
        info!(
            columns = ctx.dataset().column_count(),
            max_key_length = ctx.config().max_key_length,
            "starting exhaustive search"
        );

        match self.run(ctx, &mut attempt) {
            Ok(keys) => {
                if keys.is_empty() {
                    info!("exhaustive search found no key within the length bound");
                }
                attempt.finish_with_keys(keys)
            }
            Err(exhausted) => attempt.finish_exceeded(exhausted),
        }
    }
}
