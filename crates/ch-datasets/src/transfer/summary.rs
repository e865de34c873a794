//! Transfer phases and the result reported to callers.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Repository files into the database.
    Load,
    /// Database tables into repository files.
    Dump,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Load => write!(f, "load"),
            Direction::Dump => write!(f, "dump"),
        }
    }
}

/// Stages of a transfer. Each stage completes before the next begins;
/// only `Transferring` runs operations concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    Planning,
    SchemaApplied,
    Transferring,
    Drained,
    Reported,
}

impl TransferPhase {
    /// Move to `next`, which must be a later phase.
    pub(crate) fn advance(&mut self, next: TransferPhase) {
        debug_assert!(next > *self, "phase {:?} after {:?}", next, self);
        info!("Transfer phase: {:?} -> {:?}", self, next);
        *self = next;
    }
}

/// Result of a load or dump run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSummary {
    /// Unique run identifier.
    pub run_id: String,

    pub direction: Direction,

    /// Dataset name.
    pub dataset: String,

    /// Database loaded into or dumped from.
    pub database: String,

    /// When the transfer started.
    pub started_at: DateTime<Utc>,

    /// When the transfer completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Planned data operations, including dry-run ones.
    pub operations: usize,

    pub succeeded: usize,

    pub failed: usize,

    /// Exit status per executed operation, in completion order.
    pub outputs: Vec<i32>,

    /// Messages of the failed operations.
    pub failures: Vec<String>,

    /// Last phase reached.
    pub phase: TransferPhase,
}

impl TransferSummary {
    /// True when no operation failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// `Operation summary: succeeded=<n>, failed=<m>`
    pub fn summary_line(&self) -> String {
        format!(
            "Operation summary: succeeded={}, failed={}",
            self.succeeded, self.failed
        )
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(failed: usize) -> TransferSummary {
        let now = Utc::now();
        TransferSummary {
            run_id: "run-1".into(),
            direction: Direction::Dump,
            dataset: "iris".into(),
            database: "iris".into(),
            started_at: now,
            completed_at: now,
            duration_seconds: 0.0,
            operations: 3,
            succeeded: 3 - failed,
            failed,
            outputs: vec![0; 3],
            failures: Vec::new(),
            phase: TransferPhase::Reported,
        }
    }

    #[test]
    fn test_summary_line_always_has_both_counts() {
        assert_eq!(
            summary(0).summary_line(),
            "Operation summary: succeeded=3, failed=0"
        );
        assert!(summary(0).is_success());
        assert!(!summary(1).is_success());
    }

    #[test]
    fn test_json_field_names() {
        let json = summary(0).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["direction"], "dump");
        assert_eq!(value["phase"], "reported");
        assert_eq!(value["succeeded"], 3);
    }

    #[test]
    fn test_phases_are_ordered() {
        let mut phase = TransferPhase::Planning;
        phase.advance(TransferPhase::SchemaApplied);
        phase.advance(TransferPhase::Transferring);
        assert!(phase > TransferPhase::SchemaApplied);
        assert!(phase < TransferPhase::Reported);
    }
}
