//! In-memory dataset model consumed by the key search.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, UnikeyError};

/// A single cell value.
///
/// Values of different variants never compare equal, and `Null` equals
/// `Null`: nulls take part in uniqueness like any other value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Create a text value.
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Check whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the value as a hashable key.
    ///
    /// Returns `None` for values with no usable equality (`NaN`).
    pub fn hash_key(&self) -> Option<HashKey<'_>> {
        match self {
            Value::Null => Some(HashKey::Null),
            Value::Bool(b) => Some(HashKey::Bool(*b)),
            Value::Integer(i) => Some(HashKey::Integer(*i)),
            Value::Float(f) if f.is_nan() => None,
            // -0.0 and 0.0 are the same value
            Value::Float(f) if *f == 0.0 => Some(HashKey::Float(0.0f64.to_bits())),
            Value::Float(f) => Some(HashKey::Float(f.to_bits())),
            Value::Text(s) => Some(HashKey::Text(s.as_str())),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Borrowed, hashable view of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKey<'a> {
    Null,
    Bool(bool),
    Integer(i64),
    Float(u64),
    Text(&'a str),
}

/// A fully materialized table: ordered, unique column names and row-major cells.
///
/// The row count is fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create a dataset from positional rows.
    ///
    /// Every row must carry exactly one value per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let dataset = Self { columns, rows };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Check the structural invariants: non-empty, unique, non-blank column
    /// names and one value per column in every row.
    ///
    /// Constructors already enforce this; deserialized datasets do not.
    pub fn validate(&self) -> Result<()> {
        validate_columns(&self.columns)?;

        if let Some((idx, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.columns.len())
        {
            return Err(UnikeyError::InvalidDataset(format!(
                "row {} has {} values but {} columns are declared",
                idx,
                row.len(),
                self.columns.len()
            )));
        }
        Ok(())
    }

    /// Create a dataset from column→value records.
    ///
    /// Columns missing from a record are null. A record key that names no
    /// declared column is rejected.
    pub fn from_records(columns: Vec<String>, records: Vec<IndexMap<String, Value>>) -> Result<Self> {
        validate_columns(&columns)?;

        let mut rows = Vec::with_capacity(records.len());
        for (idx, mut record) in records.into_iter().enumerate() {
            let row: Vec<Value> = columns
                .iter()
                .map(|c| record.shift_remove(c).unwrap_or(Value::Null))
                .collect();

            if let Some(extra) = record.keys().next() {
                return Err(UnikeyError::InvalidDataset(format!(
                    "record {} has unknown column '{}'",
                    idx, extra
                )));
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    /// Build a dataset of text cells, mostly for tests and examples.
    pub fn from_strings<S: AsRef<str>>(columns: &[S], rows: &[Vec<S>]) -> Result<Self> {
        let columns = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|v| Value::text(v.as_ref())).collect())
            .collect();
        Self::new(columns, rows)
    }

    /// Column names in declared order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Name of the column at `position`.
    pub fn column_name(&self, position: usize) -> Option<&str> {
        self.columns.get(position).map(|s| s.as_str())
    }

    /// Position of a column by name.
    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Iterate over one column's values.
    pub fn column_values(&self, position: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[position])
    }
}

fn validate_columns(columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        return Err(UnikeyError::InvalidDataset("no columns declared".to_string()));
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for (idx, name) in columns.iter().enumerate() {
        if name.is_empty() {
            return Err(UnikeyError::InvalidDataset(format!(
                "column {} has an empty name",
                idx
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(UnikeyError::InvalidDataset(format!(
                "duplicate column name '{}'",
                name
            )));
        }
    }
    Ok(())
}
