//! Per-combination trace records and per-attempt results.

use serde::{Deserialize, Serialize};

use super::combo::ColumnCombo;
use super::config::StrategyKind;
use super::oracle::{Uniqueness, Verdict};

/// What happened to one traced combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceOutcome {
    /// The combo identifies every row.
    Unique,
    /// Two rows share the combo's values.
    NotUnique { first_row: usize, second_row: usize },
    /// The combo could not be evaluated.
    Fault { message: String },
    /// The strategy declined to run.
    Declined { reason: String },
    /// The strategy's budget ran out before this combo was tested.
    BudgetExceeded { limit: String },
}

impl TraceOutcome {
    /// Whether the combo was confirmed unique.
    pub fn is_unique(&self) -> bool {
        matches!(self, TraceOutcome::Unique)
    }

    /// Short label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            TraceOutcome::Unique => "unique",
            TraceOutcome::NotUnique { .. } => "not unique",
            TraceOutcome::Fault { .. } => "fault",
            TraceOutcome::Declined { .. } => "declined",
            TraceOutcome::BudgetExceeded { .. } => "budget exceeded",
        }
    }
}

impl From<&Verdict> for TraceOutcome {
    fn from(verdict: &Verdict) -> Self {
        match verdict {
            Ok(Uniqueness::Unique) => TraceOutcome::Unique,
            Ok(Uniqueness::Collision {
                first_row,
                second_row,
            }) => TraceOutcome::NotUnique {
                first_row: *first_row,
                second_row: *second_row,
            },
            Err(fault) => TraceOutcome::Fault {
                message: fault.to_string(),
            },
        }
    }
}

/// One traced test.
///
/// `(level, index)` is the generation-order tag: the combo length (or tier
/// step) and the combo's position among the entries of that level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub strategy: StrategyKind,
    pub level: usize,
    pub index: usize,
    pub columns: Vec<String>,
    pub outcome: TraceOutcome,
    /// The verdict came from the oracle memo.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

/// Ordered record of every test performed by one strategy attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchTrace {
    entries: Vec<TraceEntry>,
}

impl SearchTrace {
    /// Create an empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Entries in generation order.
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was traced.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries.
    pub fn iter(&self) -> std::slice::Iter<'_, TraceEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a SearchTrace {
    type Item = &'a TraceEntry;
    type IntoIter = std::slice::Iter<'a, TraceEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// How a strategy attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptStatus {
    /// At least one minimal key was found.
    Succeeded,
    /// The strategy ran to completion without a key.
    NoKeyFound,
    /// The strategy could not run (e.g. its capability is unavailable).
    Declined { reason: String },
    /// The strategy was aborted by its budget.
    BudgetExceeded { limit: String },
}

impl AttemptStatus {
    /// Short label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            AttemptStatus::Succeeded => "succeeded",
            AttemptStatus::NoKeyFound => "no key found",
            AttemptStatus::Declined { .. } => "declined",
            AttemptStatus::BudgetExceeded { .. } => "budget exceeded",
        }
    }
}

/// Work counters for one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptStats {
    /// Combos tested, memo hits included.
    pub combinations_tested: usize,
    /// Tests answered by the memo.
    pub cache_hits: usize,
    /// Candidates skipped as supersets of known keys or outside the frontier.
    pub pruned: usize,
    /// Per-combination faults.
    pub faults: usize,
    /// Wall-clock time of the attempt.
    pub elapsed_ms: u64,
}

/// Outcome of one strategy attempt against one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub strategy: StrategyKind,
    #[serde(flatten)]
    pub status: AttemptStatus,
    /// Minimal keys, shortest first; empty unless the attempt succeeded.
    pub minimal_keys: Vec<ColumnCombo>,
    pub trace: SearchTrace,
    pub stats: AttemptStats,
}

impl StrategyResult {
    /// Whether this attempt produced keys.
    pub fn success(&self) -> bool {
        matches!(self.status, AttemptStatus::Succeeded) && !self.minimal_keys.is_empty()
    }

    /// Strategy identifier.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.as_str()
    }

    /// Minimal keys as column-name lists.
    pub fn key_names(&self) -> Vec<Vec<String>> {
        self.minimal_keys.iter().map(|k| k.names().to_vec()).collect()
    }
}
