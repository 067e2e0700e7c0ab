//! Column profiling used to order columns for the heuristic search tiers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::input::Dataset;

/// Distinctness summary for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Column name.
    pub name: String,
    /// Zero-based position in the dataset.
    pub position: usize,
    /// Number of distinct values (null counts as one value).
    pub distinct_count: usize,
    /// Number of null cells.
    pub null_count: usize,
    /// `distinct_count / row_count`, 0.0 for an empty dataset.
    pub uniqueness_ratio: f64,
}

impl ColumnProfile {
    /// Whether this column alone identifies every row.
    pub fn is_unique(&self, row_count: usize) -> bool {
        self.distinct_count == row_count
    }
}

/// Profile every column, in declared order.
pub fn profile_columns(dataset: &Dataset) -> Vec<ColumnProfile> {
    let row_count = dataset.row_count();

    dataset
        .columns()
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let mut distinct = HashSet::new();
            let mut null_count = 0;
            for value in dataset.column_values(position) {
                if value.is_null() {
                    null_count += 1;
                }
                // NaN cells have no identity and are left out of the count
                if let Some(key) = value.hash_key() {
                    distinct.insert(key);
                }
            }

            let distinct_count = distinct.len();
            let uniqueness_ratio = if row_count == 0 {
                0.0
            } else {
                distinct_count as f64 / row_count as f64
            };

            ColumnProfile {
                name: name.clone(),
                position,
                distinct_count,
                null_count,
                uniqueness_ratio,
            }
        })
        .collect()
}

/// Sort profiles by descending uniqueness ratio, ties broken by column position.
pub fn heuristic_order(profiles: &[ColumnProfile]) -> Vec<ColumnProfile> {
    let mut ordered = profiles.to_vec();
    // Every column shares one row count, so distinct counts order like ratios.
    ordered.sort_by(|a, b| {
        b.distinct_count
            .cmp(&a.distinct_count)
            .then(a.position.cmp(&b.position))
    });
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Value;

    #[test]
    fn test_profile_counts_nulls_as_one_value() {
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![Value::Integer(1), Value::Null],
                vec![Value::Integer(2), Value::Null],
                vec![Value::Integer(3), Value::text("x")],
            ],
        )
        .unwrap();

        let profiles = profile_columns(&ds);
        assert_eq!(profiles[0].distinct_count, 3);
        assert!(profiles[0].is_unique(3));
        assert_eq!(profiles[1].distinct_count, 2);
        assert_eq!(profiles[1].null_count, 2);
        assert!((profiles[1].uniqueness_ratio - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_heuristic_order_breaks_ties_by_position() {
        let ds = Dataset::from_strings(
            &["low", "tie_a", "high", "tie_b"],
            &[
                vec!["x", "1", "1", "1"],
                vec!["x", "2", "2", "2"],
                vec!["x", "2", "3", "2"],
            ],
        )
        .unwrap();

        let ordered = heuristic_order(&profile_columns(&ds));
        let names: Vec<_> = ordered.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["high", "tie_a", "tie_b", "low"]);
    }

    #[test]
    fn test_empty_dataset_ratio_is_zero() {
        let ds = Dataset::from_strings(&["a"], &[]).unwrap();
        let profiles = profile_columns(&ds);
        assert_eq!(profiles[0].uniqueness_ratio, 0.0);
    }
}
