//! Verification outcomes and run reports

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result classification for a single probed entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    /// Connected and the stream responded positively
    Ok,
    /// Transport or connection failure
    Unreachable,
    /// Probe deadline elapsed, or the run was cancelled before it completed
    Timeout,
    /// Connected, but the response was negative or unusable
    Error,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Ok => "OK",
            VerificationStatus::Unreachable => "UNREACHABLE",
            VerificationStatus::Timeout => "TIMEOUT",
            VerificationStatus::Error => "ERROR",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, VerificationStatus::Ok)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one input entry, keyed by its position in the input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub entry_index: usize,
    pub url: String,
    pub status: VerificationStatus,
    pub detail: Option<String>,
    pub probed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunCompletion {
    /// Every entry received a probe result
    Completed,
    /// The run was cancelled; entries without a result were marked `TIMEOUT`
    Aborted,
}

/// Per-status counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub ok: usize,
    pub unreachable: usize,
    pub timeout: usize,
    pub error: usize,
}

/// Result of a single verification run
///
/// `outcomes` holds exactly one outcome per input entry, ordered by
/// `entry_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub completion: RunCompletion,
    pub outcomes: Vec<VerificationOutcome>,
}

impl VerificationReport {
    pub fn is_aborted(&self) -> bool {
        self.completion == RunCompletion::Aborted
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcome for the entry at `index` in the input collection
    pub fn outcome_for(&self, index: usize) -> Option<&VerificationOutcome> {
        self.outcomes
            .get(index)
            .filter(|outcome| outcome.entry_index == index)
            .or_else(|| self.outcomes.iter().find(|o| o.entry_index == index))
    }

    pub fn statuses(&self) -> Vec<VerificationStatus> {
        self.outcomes.iter().map(|o| o.status).collect()
    }

    /// Input indices whose outcome is anything other than `OK`
    pub fn failed_indices(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .filter(|o| !o.status.is_ok())
            .map(|o| o.entry_index)
            .collect()
    }

    pub fn summary(&self) -> StatusSummary {
        let mut summary = StatusSummary {
            total: self.outcomes.len(),
            ..Default::default()
        };

        for outcome in &self.outcomes {
            match outcome.status {
                VerificationStatus::Ok => summary.ok += 1,
                VerificationStatus::Unreachable => summary.unreachable += 1,
                VerificationStatus::Timeout => summary.timeout += 1,
                VerificationStatus::Error => summary.error += 1,
            }
        }

        summary
    }
}
