//! Append-only record of one run.
//!
//! `results` and `completed` always have the same length: slot `i` of
//! `completed` produced outcome `i` of `results`. Under continue-on-failure a
//! failing slot is recorded as [`SlotOutcome::Failed`]; under fail-fast it is
//! not recorded at all and the run stops with `success = false`.

use crate::prng::Seed;
use crate::result::{EngineError, ErrorKind};
use crate::slot::ResolvedPair;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Error index used for failures before any slot ran
pub const SETUP_ERROR_INDEX: i64 = -1;

/// Outcome of one executed slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SlotOutcome {
    /// `operation` returned a value
    Ok {
        /// Value returned by `operation`
        value: Value,
    },
    /// A lifecycle hook failed and the run continued
    Failed {
        /// Error classification
        kind: ErrorKind,
        /// Error message
        message: String,
    },
}

impl SlotOutcome {
    /// Whether the slot succeeded
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Operation value, if the slot succeeded
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Ok { value } => Some(value),
            Self::Failed { .. } => None,
        }
    }
}

/// Serializable form of the error that stopped a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportError {
    /// Error classification
    pub kind: ErrorKind,
    /// Error message
    pub message: String,
}

impl From<&EngineError> for ReportError {
    fn from(err: &EngineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Structured record of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Unique identifier of the run
    pub run_id: String,
    /// Seed the run drew from
    pub seed: Seed,
    /// Fully finished resolve+execute cycles
    pub iterations_completed: u64,
    /// Outcome per executed slot
    pub results: Vec<SlotOutcome>,
    /// Concrete pair per executed slot
    pub completed: Vec<ResolvedPair>,
    /// False once the run was aborted
    pub success: bool,
    /// Error that aborted the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportError>,
    /// `results.len()` when the run was aborted; -1 for setup failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_index: Option<i64>,
    /// Slots skipped because no candidate's precondition held
    pub dropped_slots: u64,
    /// Whether the run ended through a stop request
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stopped: bool,
}

impl Report {
    /// Fresh, successful report
    #[must_use]
    pub fn new(run_id: impl Into<String>, seed: Seed) -> Self {
        Self {
            run_id: run_id.into(),
            seed,
            iterations_completed: 0,
            results: Vec::new(),
            completed: Vec::new(),
            success: true,
            error: None,
            error_index: None,
            dropped_slots: 0,
            stopped: false,
        }
    }

    /// Record a successful slot
    pub fn push_ok(&mut self, pair: ResolvedPair, value: Value) {
        self.results.push(SlotOutcome::Ok { value });
        self.completed.push(pair);
    }

    /// Record a failed slot and keep going
    pub fn push_failed(&mut self, pair: ResolvedPair, err: &EngineError) {
        self.results.push(SlotOutcome::Failed {
            kind: err.kind(),
            message: err.to_string(),
        });
        self.completed.push(pair);
    }

    /// Abort at the current slot. Only the first abort is recorded.
    pub fn fail_here(&mut self, err: &EngineError) {
        let index = i64::try_from(self.results.len()).unwrap_or(i64::MAX);
        self.fail_at(index, err);
    }

    /// Abort before any slot of the run executed
    pub fn fail_setup(&mut self, err: &EngineError) {
        self.fail_at(SETUP_ERROR_INDEX, err);
    }

    fn fail_at(&mut self, index: i64, err: &EngineError) {
        if !self.success {
            return;
        }
        self.success = false;
        self.error = Some(ReportError::from(err));
        self.error_index = Some(index);
    }

    /// Number of slots recorded as failed
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_ok()).count()
    }

    /// Not aborted and no slot failed
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.success && self.failed_count() == 0
    }

    /// Pretty JSON rendering
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_clean() {
            "PASSED"
        } else if self.success {
            "PASSED WITH FAILURES"
        } else {
            "FAILED"
        };
        writeln!(f, "run {} (seed {}): {status}", self.run_id, self.seed)?;
        writeln!(
            f,
            "  iterations: {}, slots: {}, failed: {}, dropped: {}",
            self.iterations_completed,
            self.completed.len(),
            self.failed_count(),
            self.dropped_slots
        )?;
        for (i, (pair, outcome)) in self.completed.iter().zip(&self.results).enumerate() {
            match outcome {
                SlotOutcome::Ok { value } => writeln!(f, "  [{i}] {pair}: {value}")?,
                SlotOutcome::Failed { message, .. } => writeln!(f, "  [{i}] {pair}: FAILED {message}")?,
            }
        }
        if let (Some(err), Some(index)) = (&self.error, self.error_index) {
            writeln!(f, "  aborted at {index}: {}", err.message)?;
        }
        if self.stopped {
            writeln!(f, "  stopped on request")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::ActionConfig;
    use crate::result::Phase;
    use serde_json::json;

    fn pair(action: &str) -> ResolvedPair {
        ResolvedPair::new("alice", action, ActionConfig::new())
    }

    fn action_error() -> EngineError {
        EngineError::Action {
            action: "b".to_string(),
            actor: "alice".to_string(),
            phase: Phase::Operation,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_new_report_is_clean() {
        let report = Report::new("run-1", Seed::from_u64(1));
        assert!(report.success);
        assert!(report.is_clean());
        assert!(report.error_index.is_none());
    }

    #[test]
    fn test_fail_here_points_at_next_slot() {
        let mut report = Report::new("run-1", Seed::from_u64(1));
        report.push_ok(pair("a"), json!(1));
        report.fail_here(&action_error());
        assert!(!report.success);
        assert_eq!(report.error_index, Some(1));
        assert_eq!(report.results.len(), report.completed.len());
        assert_eq!(report.error.as_ref().unwrap().kind, ErrorKind::Action);
    }

    #[test]
    fn test_first_failure_wins() {
        let mut report = Report::new("run-1", Seed::from_u64(1));
        report.fail_setup(&EngineError::config("first"));
        report.fail_here(&action_error());
        assert_eq!(report.error_index, Some(SETUP_ERROR_INDEX));
        assert!(report.error.unwrap().message.contains("first"));
    }

    #[test]
    fn test_failed_slots_keep_success_but_not_clean() {
        let mut report = Report::new("run-1", Seed::from_u64(1));
        report.push_ok(pair("a"), json!(1));
        report.push_failed(pair("b"), &action_error());
        report.push_ok(pair("c"), json!(3));
        assert!(report.success);
        assert!(!report.is_clean());
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.results.len(), 3);
        assert!(report.to_string().contains("PASSED WITH FAILURES"));
    }

    #[test]
    fn test_json_shape() {
        let mut report = Report::new("run-1", Seed::from_u64(9));
        report.push_ok(pair("a"), json!({"id": 4}));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["seed"], json!(9));
        assert_eq!(value["results"][0], json!({"status": "ok", "value": {"id": 4}}));
        assert_eq!(value["completed"][0], json!({"actor": "alice", "action": "a"}));
        assert!(value.get("errorIndex").is_none());
        assert!(value.get("stopped").is_none());

        let back: Report = serde_json::from_value(value).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_display_mentions_abort() {
        let mut report = Report::new("run-1", Seed::from_u64(1));
        report.fail_setup(&EngineError::UnknownPlan {
            name: "nightly".to_string(),
        });
        let text = report.to_string();
        assert!(text.contains("FAILED"));
        assert!(text.contains("aborted at -1"));
    }
}
