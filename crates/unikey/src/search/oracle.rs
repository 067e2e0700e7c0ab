//! Memoized uniqueness test for column combinations.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::combo::ColumnCombo;
use crate::input::{Dataset, HashKey};

/// A failure to evaluate one combination.
///
/// Faults are isolated to the combo that raised them; the search continues.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ComboFault {
    /// A cell has no usable equality (e.g. a NaN float).
    #[error("incomparable value in column '{column}' at row {row}")]
    IncomparableValue { column: String, row: usize },
}

/// Verdict for one combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Uniqueness {
    /// Every row projects to a distinct tuple.
    Unique,
    /// Two rows project to the same tuple.
    Collision { first_row: usize, second_row: usize },
}

impl Uniqueness {
    /// Whether the combo identifies every row.
    pub fn is_unique(&self) -> bool {
        matches!(self, Uniqueness::Unique)
    }
}

/// Result of one oracle test.
pub type Verdict = std::result::Result<Uniqueness, ComboFault>;

/// Counters describing oracle work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleStats {
    /// Combos actually projected over the rows.
    pub evaluations: usize,
    /// Tests answered from the memo.
    pub cache_hits: usize,
}

/// Tests whether a column combination is a unique identifier of a dataset.
///
/// Verdicts (including faults) are memoized by the combo's canonical
/// positions, so one oracle can be shared by every strategy of a run.
pub struct UniquenessOracle<'a> {
    dataset: &'a Dataset,
    cache: HashMap<Vec<usize>, Verdict>,
    stats: OracleStats,
}

impl<'a> UniquenessOracle<'a> {
    /// Create an oracle with an empty memo.
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            cache: HashMap::new(),
            stats: OracleStats::default(),
        }
    }

    /// The dataset under test.
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Work counters so far.
    pub fn stats(&self) -> OracleStats {
        self.stats
    }

    /// Whether a verdict for `combo` is memoized.
    pub fn is_cached(&self, combo: &ColumnCombo) -> bool {
        self.cache.contains_key(combo.positions())
    }

    /// Test one combo.
    pub fn test(&mut self, combo: &ColumnCombo) -> Verdict {
        match self.cache.entry(combo.positions().to_vec()) {
            Entry::Occupied(entry) => {
                self.stats.cache_hits += 1;
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                self.stats.evaluations += 1;
                entry.insert(evaluate(self.dataset, combo.positions())).clone()
            }
        }
    }

    /// Convenience wrapper returning only uniqueness.
    pub fn is_unique(&mut self, combo: &ColumnCombo) -> Result<bool, ComboFault> {
        self.test(combo).map(|u| u.is_unique())
    }

    /// Test several combos, returning verdicts in input order.
    ///
    /// With `parallel` set, combos missing from the memo are evaluated on the
    /// rayon pool; the memo and counters are updated afterwards in input
    /// order, so the outcome does not depend on scheduling.
    pub fn test_many(&mut self, combos: &[ColumnCombo], parallel: bool) -> Vec<Verdict> {
        if !parallel || combos.len() < 2 {
            return combos.iter().map(|c| self.test(c)).collect();
        }

        let dataset = self.dataset;
        let cache = &self.cache;
        let fresh: Vec<Option<Verdict>> = combos
            .par_iter()
            .map(|c| {
                if cache.contains_key(c.positions()) {
                    None
                } else {
                    Some(evaluate(dataset, c.positions()))
                }
            })
            .collect();

        combos
            .iter()
            .zip(fresh)
            .map(|(combo, verdict)| match verdict {
                Some(v) if !self.cache.contains_key(combo.positions()) => {
                    self.stats.evaluations += 1;
                    self.cache.insert(combo.positions().to_vec(), v.clone());
                    v
                }
                _ => self.test(combo),
            })
            .collect()
    }
}

/// Project every row onto `positions` and look for the first colliding pair.
fn evaluate(dataset: &Dataset, positions: &[usize]) -> Verdict {
    let mut seen: HashMap<Vec<HashKey<'_>>, usize> = HashMap::with_capacity(dataset.row_count());

    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let tuple = positions
            .iter()
            .map(|&p| {
                row[p].hash_key().ok_or_else(|| ComboFault::IncomparableValue {
                    column: dataset.columns()[p].clone(),
                    row: row_idx,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(&first_row) = seen.get(&tuple) {
            return Ok(Uniqueness::Collision {
                first_row,
                second_row: row_idx,
            });
        }
        seen.insert(tuple, row_idx);
    }

    Ok(Uniqueness::Unique)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Value;

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
    fn test_pair_is_unique_but_singles_are_not() {
        let ds = scenario_b();
        let mut oracle = UniquenessOracle::new(&ds);

        let a = ColumnCombo::from_names(&ds, &["a"]).unwrap();
        let ab = ColumnCombo::from_names(&ds, &["a", "b"]).unwrap();

        assert_eq!(
            oracle.test(&a),
            Ok(Uniqueness::Collision {
                first_row: 0,
                second_row: 1
            })
        );
        assert_eq!(oracle.is_unique(&ab), Ok(true));
    }

    #[test]
    fn test_empty_combo_unique_only_for_tiny_datasets() {
        let ds = scenario_b();
        let mut oracle = UniquenessOracle::new(&ds);
        assert_eq!(oracle.is_unique(&ColumnCombo::empty()), Ok(false));

        let one = Dataset::from_strings(&["a"], &[vec!["x"]]).unwrap();
        let mut oracle = UniquenessOracle::new(&one);
        assert_eq!(oracle.is_unique(&ColumnCombo::empty()), Ok(true));

        let none = Dataset::from_strings(&["a"], &[]).unwrap();
        let mut oracle = UniquenessOracle::new(&none);
        assert_eq!(oracle.is_unique(&ColumnCombo::empty()), Ok(true));
    }

    #[test]
    fn test_nulls_compare_equal() {
        let ds = Dataset::new(
            vec!["a".into()],
            vec![vec![Value::Null], vec![Value::Null]],
        )
        .unwrap();
        let mut oracle = UniquenessOracle::new(&ds);
        let a = ColumnCombo::from_names(&ds, &["a"]).unwrap();
        assert_eq!(oracle.is_unique(&a), Ok(false));
    }

    #[test]
    fn test_nan_is_a_fault_for_that_combo_only() {
        let ds = Dataset::new(
            vec!["id".into(), "score".into()],
            vec![
                vec![Value::Integer(1), Value::Float(0.5)],
                vec![Value::Integer(2), Value::Float(f64::NAN)],
            ],
        )
        .unwrap();
        let mut oracle = UniquenessOracle::new(&ds);

        let score = ColumnCombo::from_names(&ds, &["score"]).unwrap();
        let id = ColumnCombo::from_names(&ds, &["id"]).unwrap();

        assert_eq!(
            oracle.test(&score),
            Err(ComboFault::IncomparableValue {
                column: "score".to_string(),
                row: 1
            })
        );
        assert_eq!(oracle.is_unique(&id), Ok(true));
    }

    #[test]
    fn test_memo_counts_hits() {
        let ds = scenario_b();
        let mut oracle = UniquenessOracle::new(&ds);
        let ab = ColumnCombo::from_names(&ds, &["b", "a"]).unwrap();

        oracle.test(&ab).unwrap();
        assert!(oracle.is_cached(&ab));
        oracle.test(&ab).unwrap();

        assert_eq!(
            oracle.stats(),
            OracleStats {
                evaluations: 1,
                cache_hits: 1
            }
        );
    }

    #[test]
    fn test_many_parallel_matches_sequential() {
        let ds = scenario_b();
        let combos = vec![
            ColumnCombo::from_names(&ds, &["a"]).unwrap(),
            ColumnCombo::from_names(&ds, &["b"]).unwrap(),
            ColumnCombo::from_names(&ds, &["a", "b"]).unwrap(),
            ColumnCombo::from_names(&ds, &["a"]).unwrap(),
        ];

        let mut seq = UniquenessOracle::new(&ds);
        let mut par = UniquenessOracle::new(&ds);
        assert_eq!(seq.test_many(&combos, false), par.test_many(&combos, true));
        assert_eq!(seq.stats(), par.stats());
        assert_eq!(par.stats().evaluations, 3);
        assert_eq!(par.stats().cache_hits, 1);
    }
}
