//! Level-wise Apriori key search.
//!
//! Level `k` candidates are built from the *frontier*, the non-unique combos
//! of level `k - 1`, by joining pairs that share their first `k - 2` columns.
//! Any candidate with a `(k - 1)`-subset outside the frontier is dropped
//! untested: that subset was either unique (so the candidate is not minimal)
//! or never generated. Columns are ranked by descending uniqueness ratio and
//! candidates are tested in lexicographic rank order.

use std::collections::HashSet;

use tracing::{debug, info};

use super::combo::ColumnCombo;
use super::config::{LevelPolicy, StrategyKind};
use super::context::{Attempt, BudgetExhausted, SearchContext};
use super::strategy::KeySearch;
use super::trace::StrategyResult;

/// The smart tier.
#[derive(Debug, Clone, Copy, Default)]
pub struct AprioriSearch;

impl AprioriSearch {
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

        let policy = ctx.config().smart_policy;
        let max_len = ctx.config().max_key_length;
        let ranked = ctx.heuristic_order().to_vec();
        let mut keys: Vec<ColumnCombo> = Vec::new();

        // Combos are held as ascending rank lists until they reach the oracle.
        let mut candidates: Vec<Vec<usize>> = (0..ranked.len()).map(|r| vec![r]).collect();

        for level in 1..=max_len {
            if candidates.is_empty() {
                break;
            }

            let mut batch = Vec::with_capacity(candidates.len());
            let mut batch_ranks = Vec::with_capacity(candidates.len());
            for ranks in candidates {
                let positions: Vec<usize> = ranks.iter().map(|&r| ranked[r]).collect();
                let combo = ctx.combo(&positions);
                if keys.iter().any(|k| k.is_subset_of(&combo)) {
                    attempt.prune();
                    continue;
                }
                batch.push(combo);
                batch_ranks.push(ranks);
            }

            debug!(level, candidates = batch.len(), "smart search level");
            let verdicts = attempt.test_all(ctx, &batch)?;

            let mut frontier = Vec::new();
            let mut level_keys = 0;
            for ((combo, ranks), unique) in batch.into_iter().zip(batch_ranks).zip(verdicts) {
                if unique {
                    keys.push(combo);
                    level_keys += 1;
                } else {
                    frontier.push(ranks);
                }
            }

            if level_keys > 0 {
                info!(level, keys = level_keys, "smart search found keys");
                if policy == LevelPolicy::StopAtFirstLevel {
                    break;
                }
            }

            let (next, dropped) = apriori_gen(&frontier);
            for _ in 0..dropped {
                attempt.prune();
            }
            candidates = next;
        }

        Ok(keys)
    }
}

/// Join frontier combos (ascending rank lists of equal length, sorted) into
/// the next level's candidates.
///
/// Returns the candidates in lexicographic order and the number of joined
/// candidates dropped by the subset check.
pub(crate) fn apriori_gen(frontier: &[Vec<usize>]) -> (Vec<Vec<usize>>, usize) {
    let members: HashSet<&[usize]> = frontier.iter().map(Vec::as_slice).collect();
    let mut candidates = Vec::new();
    let mut dropped = 0;

    for (i, left) in frontier.iter().enumerate() {
        let Some((_, prefix)) = left.split_last() else {
            continue;
        };
        for right in &frontier[i + 1..] {
            if !right.starts_with(prefix) {
                break;
            }
            let mut joined = left.clone();
            joined.push(right[right.len() - 1]);

            let closed = (0..joined.len()).all(|skip| {
                let subset: Vec<usize> = joined
                    .iter()
                    .enumerate()
                    .filter(|&(idx, _)| idx != skip)
                    .map(|(_, &r)| r)
                    .collect();
                members.contains(subset.as_slice())
            });

            if closed {
                candidates.push(joined);
            } else {
                dropped += 1;
            }
        }
    }

    (candidates, dropped)
}

impl KeySearch for AprioriSearch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Smart
    }

    fn attempt(&self, ctx: &mut SearchContext<'_>) -> StrategyResult {
        let mut attempt = ctx.begin(StrategyKind::Smart);
        info!(
            columns = ctx.dataset().column_count(),
            max_key_length = ctx.config().max_key_length,
            policy = ?ctx.config().smart_policy,
            "starting smart search"
        );

        match self.run(ctx, &mut attempt) {
            Ok(keys) => attempt.finish_with_keys(keys),
            Err(exhausted) => attempt.finish_exceeded(exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Dataset;
    use crate::search::config::SearchConfig;
    use crate::search::trace::{AttemptStatus, TraceOutcome};

    fn run(ds: &Dataset, config: &SearchConfig) -> StrategyResult {
        let mut ctx = SearchContext::new(ds, config);
        AprioriSearch::new().attempt(&mut ctx)
    }

    #[test]
    fn test_gen_joins_shared_prefixes() {
        let frontier = vec![vec![0, 1], vec![0, 2], vec![1, 2], vec![1, 3]];
        let (candidates, dropped) = apriori_gen(&frontier);
        // [0,1,2] is closed; [1,2,3] needs [2,3] which is missing
        assert_eq!(candidates, vec![vec![0, 1, 2]]);
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_gen_from_singletons() {
        let frontier = vec![vec![0], vec![2], vec![3]];
        let (candidates, dropped) = apriori_gen(&frontier);
        assert_eq!(candidates, vec![vec![0, 2], vec![0, 3], vec![2, 3]]);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_finds_pair_key() {
        let ds = Dataset::from_strings(
            &["a", "b"],
            &[
                vec!["1", "1"],
                vec!["1", "2"],
                vec!["2", "1"],
                vec!["2", "2"],
            ],
        )
        .unwrap();
        let result = run(&ds, &SearchConfig::default());

        assert!(result.success());
        assert_eq!(
            result.key_names(),
            vec![vec!["a".to_string(), "b".to_string()]]
        );
        let levels: Vec<_> = result.trace.iter().map(|e| (e.level, e.index)).collect();
        assert_eq!(levels, vec![(0, 0), (1, 0), (1, 1), (2, 0)]);
    }

    #[test]
    fn test_stops_after_first_successful_level() {
        // x and y are each unique, so no longer key is explored.
        let ds = Dataset::from_strings(
            &["x", "y", "z"],
            &[vec!["1", "a", "k"], vec!["2", "b", "k"], vec!["3", "c", "m"]],
        )
        .unwrap();
        let result = run(&ds, &SearchConfig::default());

        assert_eq!(
            result.key_names(),
            vec![vec!["x".to_string()], vec!["y".to_string()]]
        );
        assert!(result.trace.iter().all(|e| e.level <= 1));
        assert_eq!(result.trace.len(), 4);
    }

    #[test]
    fn test_continue_policy_reports_longer_keys() {
        // "id" is unique alone; "p"+"q" is a longer minimal key.
        let ds = Dataset::from_strings(
            &["id", "p", "q"],
            &[
                vec!["1", "a", "x"],
                vec!["2", "a", "y"],
                vec!["3", "b", "x"],
                vec!["4", "b", "y"],
            ],
        )
        .unwrap();

        let stop = run(&ds, &SearchConfig::default());
        assert_eq!(stop.key_names(), vec![vec!["id".to_string()]]);

        let config = SearchConfig::default().with_smart_policy(LevelPolicy::ContinueToMaxLength);
        let cont = run(&ds, &config);
        assert_eq!(
            cont.key_names(),
            vec![
                vec!["id".to_string()],
                vec!["p".to_string(), "q".to_string()]
            ]
        );
        // supersets of "id" are never generated
        assert!(cont
            .trace
            .iter()
            .all(|e| e.level < 2 || !e.columns.contains(&"id".to_string())));
    }

    #[test]
    fn test_duplicate_rows_find_nothing() {
        let ds = Dataset::from_strings(
            &["a", "b"],
            &[vec!["1", "2"], vec!["1", "2"], vec!["3", "4"]],
        )
        .unwrap();
        let result = run(&ds, &SearchConfig::default());
        assert_eq!(result.status, AttemptStatus::NoKeyFound);
        assert!(result
            .trace
            .iter()
            .all(|e| matches!(e.outcome, TraceOutcome::NotUnique { .. })));
    }
}
