//! Column combinations with a canonical, position-ordered identity.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnikeyError};
use crate::input::Dataset;

/// A set of columns, stored deduplicated and ordered by column position.
///
/// Two combos over the same dataset are equal iff they hold the same
/// positions. Combos order by length first, then by positions, so sorted key
/// sets list the shortest keys first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnCombo {
    positions: Vec<usize>,
    names: Vec<String>,
}

impl ColumnCombo {
    /// The empty combo.
    pub fn empty() -> Self {
        Self {
            positions: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Build a combo from column positions in any order.
    ///
    /// Positions outside the dataset are an `InvalidDataset` error.
    pub fn from_positions(dataset: &Dataset, positions: &[usize]) -> Result<Self> {
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        positions.dedup();

        let names = positions
            .iter()
            .map(|&p| {
                dataset.column_name(p).map(str::to_string).ok_or_else(|| {
                    UnikeyError::InvalidDataset(format!(
                        "column position {} is out of range ({} columns)",
                        p,
                        dataset.column_count()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { positions, names })
    }

    /// Build a combo from column names in any order.
    pub fn from_names<S: AsRef<str>>(dataset: &Dataset, names: &[S]) -> Result<Self> {
        let positions = names
            .iter()
            .map(|n| {
                dataset.column_position(n.as_ref()).ok_or_else(|| {
                    UnikeyError::InvalidDataset(format!("unknown column '{}'", n.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_positions(dataset, &positions)
    }

    /// Internal constructor for positions already known to be valid.
    pub(crate) fn from_valid_positions(dataset: &Dataset, positions: &[usize]) -> Self {
        let mut positions = positions.to_vec();
        positions.sort_unstable();
        positions.dedup();
        let names = positions
            .iter()
            .map(|&p| dataset.columns()[p].clone())
            .collect();
        Self { positions, names }
    }

    /// Column positions, ascending.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    /// Column names, in position order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether this is the empty combo.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether the combo includes the column at `position`.
    pub fn contains(&self, position: usize) -> bool {
        self.positions.binary_search(&position).is_ok()
    }

    /// Whether every column of `self` is in `other`.
    pub fn is_subset_of(&self, other: &ColumnCombo) -> bool {
        self.positions.iter().all(|&p| other.contains(p))
    }

    /// Whether `self` is a subset of `other` and smaller.
    pub fn is_proper_subset_of(&self, other: &ColumnCombo) -> bool {
        self.len() < other.len() && self.is_subset_of(other)
    }

    /// The combo without the column at `position`.
    pub fn without(&self, position: usize) -> ColumnCombo {
        let mut out = self.clone();
        if let Ok(idx) = out.positions.binary_search(&position) {
            out.positions.remove(idx);
            out.names.remove(idx);
        }
        out
    }

    /// Canonical text signature, e.g. `a|b`.
    pub fn signature(&self) -> String {
        self.names.join("|")
    }
}

impl Ord for ColumnCombo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.positions
            .len()
            .cmp(&other.positions.len())
            .then_with(|| self.positions.cmp(&other.positions))
    }
}

impl PartialOrd for ColumnCombo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ColumnCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.join(", "))
    }
}

/// Reduce a key list to a sorted, duplicate-free set in which no key is a
/// proper superset of another.
pub fn minimal_key_set(keys: impl IntoIterator<Item = ColumnCombo>) -> Vec<ColumnCombo> {
    let mut sorted: Vec<ColumnCombo> = keys.into_iter().collect();
    sorted.sort();
    sorted.dedup();

    let mut minimal: Vec<ColumnCombo> = Vec::with_capacity(sorted.len());
    for key in sorted {
        if !minimal.iter().any(|kept| kept.is_subset_of(&key)) {
            minimal.push(key);
        }
    }
    minimal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::from_strings(&["a", "b", "c", "d"], &[vec!["1", "2", "3", "4"]]).unwrap()
    }

    #[test]
    fn test_canonical_identity() {
        let ds = dataset();
        let x = ColumnCombo::from_names(&ds, &["c", "a", "c"]).unwrap();
        let y = ColumnCombo::from_positions(&ds, &[0, 2]).unwrap();
        assert_eq!(x, y);
        assert_eq!(x.names(), &["a", "c"]);
        assert_eq!(x.signature(), "a|c");
        assert_eq!(x.to_string(), "[a, c]");
    }

    #[test]
    fn test_unknown_columns_rejected() {
        let ds = dataset();
        assert!(ColumnCombo::from_names(&ds, &["zz"]).is_err());
        assert!(ColumnCombo::from_positions(&ds, &[9]).is_err());
    }

    #[test]
    fn test_subset_relations() {
        let ds = dataset();
        let ab = ColumnCombo::from_names(&ds, &["a", "b"]).unwrap();
        let abc = ColumnCombo::from_names(&ds, &["a", "b", "c"]).unwrap();
        assert!(ab.is_proper_subset_of(&abc));
        assert!(ab.is_subset_of(&ab));
        assert!(!ab.is_proper_subset_of(&ab));
        assert!(ColumnCombo::empty().is_subset_of(&ab));
        assert_eq!(abc.without(1), ColumnCombo::from_names(&ds, &["a", "c"]).unwrap());
    }

    #[test]
    fn test_ordering_is_length_first() {
        let ds = dataset();
        let mut combos = vec![
            ColumnCombo::from_names(&ds, &["a", "b"]).unwrap(),
            ColumnCombo::from_names(&ds, &["d"]).unwrap(),
            ColumnCombo::from_names(&ds, &["a", "c"]).unwrap(),
        ];
        combos.sort();
        let sigs: Vec<_> = combos.iter().map(|c| c.signature()).collect();
        assert_eq!(sigs, vec!["d", "a|b", "a|c"]);
    }

    #[test]
    fn test_minimal_key_set_drops_supersets() {
        let ds = dataset();
        let keys = vec![
            ColumnCombo::from_names(&ds, &["a", "b", "c"]).unwrap(),
            ColumnCombo::from_names(&ds, &["a", "b"]).unwrap(),
            ColumnCombo::from_names(&ds, &["c", "d"]).unwrap(),
            ColumnCombo::from_names(&ds, &["a", "b"]).unwrap(),
        ];
        let minimal = minimal_key_set(keys);
        let sigs: Vec<_> = minimal.iter().map(|c| c.signature()).collect();
        assert_eq!(sigs, vec!["a|b", "c|d"]);
    }
}
