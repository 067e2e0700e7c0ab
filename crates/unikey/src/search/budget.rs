//! Enforcement of per-attempt work and time budgets.

use std::time::Instant;

use super::config::Budget;

/// Tracks spending against a [`Budget`] for one strategy attempt.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    budget: Budget,
    started: Instant,
    spent: usize,
}

impl BudgetTracker {
    /// Start the clock on `budget`.
    pub fn start(budget: Budget) -> Self {
        Self {
            budget,
            started: Instant::now(),
            spent: 0,
        }
    }

    /// Combinations charged so far.
    pub fn spent(&self) -> usize {
        self.spent
    }

    /// Milliseconds since the attempt started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// How many of `wanted` more combinations may be tested.
    ///
    /// Returns `Err` with a description of the exhausted limit when none can.
    pub fn allowance(&self, wanted: usize) -> Result<usize, String> {
        if let Some(max) = self.budget.max_duration() {
            if self.started.elapsed() >= max {
                return Err(format!("time limit of {} ms", max.as_millis()));
            }
        }

        match self.budget.max_combinations {
            Some(max) if self.spent >= max => Err(format!("combination limit of {}", max)),
            Some(max) => Ok(wanted.min(max - self.spent)),
            None => Ok(wanted),
        }
    }

    /// Record `count` tested combinations.
    pub fn charge(&mut self, count: usize) {
        self.spent += count;
    }

    /// Describe the limit that stopped a partially granted request.
    pub fn exhausted_limit(&self) -> String {
        match self.budget.max_combinations {
            Some(max) if self.spent >= max => format!("combination limit of {}", max),
            _ => match self.budget.max_millis {
                Some(ms) => format!("time limit of {} ms", ms),
                None => "unknown limit".to_string(),
            },
        }
    }
}
