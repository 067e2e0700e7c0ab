//! Search configuration: strategy order, depth bound and budgets.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnikeyError};

/// Default bound on key length.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 5;

/// Identifier of one search tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// External functional-dependency probe.
    Probe,
    /// Greedy accumulator over columns ordered by uniqueness.
    Linear,
    /// Level-wise Apriori search with frontier pruning.
    Smart,
    /// Level-wise brute force.
    Exhaustive,
}

impl StrategyKind {
    /// All tiers in default order.
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Probe,
        StrategyKind::Linear,
        StrategyKind::Smart,
        StrategyKind::Exhaustive,
    ];

    /// Lowercase identifier used in configuration and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Probe => "probe",
            StrategyKind::Linear => "linear",
            StrategyKind::Smart => "smart",
            StrategyKind::Exhaustive => "exhaustive",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = UnikeyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "probe" | "fd" | "super_smart" => Ok(StrategyKind::Probe),
            "linear" => Ok(StrategyKind::Linear),
            "smart" | "apriori" => Ok(StrategyKind::Smart),
            "exhaustive" | "brute" => Ok(StrategyKind::Exhaustive),
            other => Err(UnikeyError::Config(format!(
                "unknown strategy '{}'. Use: probe, linear, smart, exhaustive",
                other
            ))),
        }
    }
}

/// How far the smart tier climbs once a level has produced a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelPolicy {
    /// Finish the first level that yields a key, then stop.
    #[default]
    StopAtFirstLevel,
    /// Keep climbing to `max_key_length`, pruning supersets of found keys.
    ContinueToMaxLength,
}

/// Work limit for one strategy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Budget {
    /// Maximum combinations tested (memo hits included).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_combinations: Option<usize>,
    /// Maximum wall-clock time in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_millis: Option<u64>,
}

impl Budget {
    /// No limits.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Limit the number of combinations tested.
    pub fn with_max_combinations(mut self, max: usize) -> Self {
        self.max_combinations = Some(max);
        self
    }

    /// Limit wall-clock time.
    pub fn with_max_duration(mut self, max: Duration) -> Self {
        self.max_millis = Some(max.as_millis() as u64);
        self
    }

    /// Time limit as a duration.
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_millis.map(Duration::from_millis)
    }

    /// Whether neither limit is set.
    pub fn is_unlimited(&self) -> bool {
        self.max_combinations.is_none() && self.max_millis.is_none()
    }
}

/// Configuration for one dataset's key search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Longest key the combinatorial tiers will consider.
    pub max_key_length: usize,
    /// Tiers to attempt, in order.
    pub strategy_order: Vec<StrategyKind>,
    /// Optional per-tier work limits.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub budgets: BTreeMap<StrategyKind, Budget>,
    /// Level policy for the smart tier.
    pub smart_policy: LevelPolicy,
    /// Evaluate combos of one level on the rayon pool.
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            strategy_order: StrategyKind::ALL.to_vec(),
            budgets: BTreeMap::new(),
            smart_policy: LevelPolicy::default(),
            parallel: false,
        }
    }
}

impl SearchConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key length bound.
    pub fn with_max_key_length(mut self, max: usize) -> Self {
        self.max_key_length = max;
        self
    }

    /// Set the strategy order.
    pub fn with_strategy_order(mut self, order: impl Into<Vec<StrategyKind>>) -> Self {
        self.strategy_order = order.into();
        self
    }

    /// Set the budget for one strategy.
    pub fn with_budget(mut self, strategy: StrategyKind, budget: Budget) -> Self {
        self.budgets.insert(strategy, budget);
        self
    }

    /// Set the smart tier's level policy.
    pub fn with_smart_policy(mut self, policy: LevelPolicy) -> Self {
        self.smart_policy = policy;
        self
    }

    /// Enable or disable parallel evaluation within a level.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Budget for a strategy (unlimited when none is configured).
    pub fn budget_for(&self, strategy: StrategyKind) -> Budget {
        self.budgets.get(&strategy).copied().unwrap_or_default()
    }

    /// Check the configuration for values the search cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_key_length == 0 {
            return Err(UnikeyError::Config(
                "max_key_length must be a positive integer".to_string(),
            ));
        }
        if self.strategy_order.is_empty() {
            return Err(UnikeyError::Config(
                "strategy_order must name at least one strategy".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for kind in &self.strategy_order {
            if !seen.insert(kind) {
                return Err(UnikeyError::Config(format!(
                    "strategy '{}' appears more than once in strategy_order",
                    kind
                )));
            }
        }
        Ok(())
    }

    /// Parse a comma-separated strategy list such as `linear,smart`.
    pub fn parse_order(list: &str) -> Result<Vec<StrategyKind>> {
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(StrategyKind::from_str)
            .collect()
    }

    /// Load and validate a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| UnikeyError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: SearchConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }
}
