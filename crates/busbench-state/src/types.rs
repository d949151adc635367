//! Persisted record types.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use busbench_core::ParameterSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStatus {
    Pending,
    Done,
    Skipped,
}

impl SweepStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SweepStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SweepStatus::Pending => "pending",
            SweepStatus::Done => "done",
            SweepStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for SweepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub params: ParameterSet,
    pub status: SweepStatus,
    /// Number of terminal transitions recorded, 0 or 1.
    pub attempts: u32,
    pub updated_at: u64,
}

impl SweepRecord {
    pub fn pending(params: ParameterSet) -> Self {
        Self {
            params,
            status: SweepStatus::Pending,
            attempts: 0,
            updated_at: epoch_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Done,
    Skipped,
    /// A fatal error stopped the campaign during this attempt.
    Aborted,
}

impl From<RunOutcome> for SweepStatus {
    fn from(outcome: RunOutcome) -> Self {
        match outcome {
            RunOutcome::Done => SweepStatus::Done,
            RunOutcome::Skipped => SweepStatus::Skipped,
            RunOutcome::Aborted => SweepStatus::Pending,
        }
    }
}

/// One execution attempt, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    /// Assigned by the store on append.
    #[serde(default)]
    pub seq: u64,
    pub test: String,
    pub params: ParameterSet,
    pub experiment_id: String,
    pub backup_dir: String,
    /// Set for incremental steps.
    #[serde(default)]
    pub iteration_id: Option<String>,
    pub outcome: RunOutcome,
    #[serde(default)]
    pub error: Option<String>,
    pub timestamp: u64,
}

/// Per-status totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepCounts {
    pub pending: usize,
    pub done: usize,
    pub skipped: usize,
}

impl SweepCounts {
    pub fn total(&self) -> usize {
        self.pending + self.done + self.skipped
    }

    pub fn terminal(&self) -> usize {
        self.done + self.skipped
    }
}

/// Seconds since the Unix epoch.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_attempt_leaves_combination_pending() {
        assert_eq!(SweepStatus::from(RunOutcome::Aborted), SweepStatus::Pending);
        assert_eq!(SweepStatus::from(RunOutcome::Skipped), SweepStatus::Skipped);
        assert_eq!(serde_json::to_string(&RunOutcome::Aborted).unwrap(), "\"aborted\"");
    }
}
