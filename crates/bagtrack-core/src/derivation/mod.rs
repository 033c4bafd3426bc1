//! # State Derivation Engine
//!
//! Turns an ordered checkpoint history into a [`DerivedOperationalState`].
//!
//! ## Contract
//!
//! - Pure: no I/O, no clock reads. The evaluation time is a parameter and is
//!   used for every time comparison in one invocation.
//! - Total: every well-typed history, including an empty one, produces a
//!   record. There is no error path.
//! - Idempotent: identical inputs give identical output.
//!
//! The expected next stage is supplied by the caller (normally
//! [`expected_next_stage`] applied to the current stage). The engine drops it
//! when nothing has been scanned or the current stage is terminal, so a
//! terminal bag never carries a prediction whatever the caller passed.

mod history;
mod risk;
mod status;

pub use history::{completed_stages, current_stage};
pub use risk::{
    RiskAssessor, RiskLevel, RiskThresholds, delta_as_minutes, time_since_last_scan,
};
pub use status::{
    NOT_CHECKED_IN_LABEL, OperationalStatus, UNKNOWN_STATUS_LABEL, classify,
    label_for_status_name, status_label,
};

use crate::CheckpointEvent;
use crate::system::{CheckpointStage, TransitionTable, expected_next_stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// DERIVED STATE
// =============================================================================

/// Operational state derived from one bag's history. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedOperationalState {
    /// Distinct stages seen, in order of first occurrence.
    pub completed_stages: Vec<CheckpointStage>,
    /// Stage of the latest scan.
    pub current_stage: Option<CheckpointStage>,
    /// Predicted next stage.
    pub expected_next_stage: Option<CheckpointStage>,
    pub operational_status: OperationalStatus,
    pub status_label: String,
    pub risk_level: RiskLevel,
    /// Minutes since the latest scan. Negative under clock skew.
    pub time_since_last_scan_minutes: Option<f64>,
    pub is_delayed: bool,
    pub is_terminal: bool,
}

// =============================================================================
// STATE DERIVER
// =============================================================================

/// State Deriver - holds the risk configuration and runs the pipeline.
#[derive(Debug, Clone, Default)]
pub struct StateDeriver {
    assessor: RiskAssessor,
}

impl StateDeriver {
    /// Deriver with default timings and thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deriver with a custom transition table and thresholds.
    #[must_use]
    pub fn with_config(table: TransitionTable, thresholds: RiskThresholds) -> Self {
        Self {
            assessor: RiskAssessor::with_config(table, thresholds),
        }
    }

    #[must_use]
    pub fn assessor(&self) -> &RiskAssessor {
        &self.assessor
    }

    /// Derive the operational state of a history at `now`.
    #[must_use]
    pub fn derive(
        &self,
        history: &[CheckpointEvent],
        expected_next: Option<CheckpointStage>,
        now: DateTime<Utc>,
    ) -> DerivedOperationalState {
        let completed = completed_stages(history);
        let current = current_stage(history);

        let expected_next = match current {
            Some(stage) if !stage.is_terminal() => expected_next,
            _ => None,
        };

        let risk_level = self.assessor.assess(history, expected_next, now);
        let operational_status = classify(current, expected_next, || risk_level);
        let status_label = status_label(operational_status, current, expected_next);
        let time_since = time_since_last_scan(history, now).map(delta_as_minutes);

        DerivedOperationalState {
            completed_stages: completed,
            current_stage: current,
            expected_next_stage: expected_next,
            operational_status,
            status_label,
            risk_level,
            time_since_last_scan_minutes: time_since,
            is_delayed: risk_level.is_delayed(),
            is_terminal: current.is_some_and(CheckpointStage::is_terminal),
        }
    }

    /// Derive with the prediction computed from the history itself.
    #[must_use]
    pub fn derive_predicted(
        &self,
        history: &[CheckpointEvent],
        now: DateTime<Utc>,
    ) -> DerivedOperationalState {
        let next = expected_next_stage(current_stage(history));
        self.derive(history, next, now)
    }
}

/// Derive with the default deriver.
#[must_use]
pub fn derive_operational_state(
    history: &[CheckpointEvent],
    expected_next: Option<CheckpointStage>,
    now: DateTime<Utc>,
) -> DerivedOperationalState {
    StateDeriver::new().derive(history, expected_next, now)
}

// =============================================================================
// TESTS
// =============================================================================
