//! # Risk Assessment
//!
//! Scores how overdue the predicted next scan is.
//!
//! | Transition | Elapsed | Risk |
//! |------------|---------|------|
//! | fixed `D` | `> HIGH_MULTIPLIER * D` | HIGH |
//! | fixed `D` | `> MEDIUM_MULTIPLIER * D` | MEDIUM |
//! | variable / unknown | `> VARIABLE_CEILING` | MEDIUM |
//! | anything else | | LOW |
//!
//! Elapsed time is not clamped. A scan stamped in the future (clock skew)
//! gives a negative elapsed time, which never exceeds a threshold and so
//! scores LOW. Comparisons use exact `TimeDelta` arithmetic; no floats.

use crate::CheckpointEvent;
use crate::primitives::{HIGH_RISK_MULTIPLIER, MEDIUM_RISK_MULTIPLIER, VARIABLE_CEILING_MINUTES};
use crate::system::{CheckpointStage, ExpectedDuration, TransitionTable};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// RISK LEVEL
// =============================================================================

/// Three-tier delay risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    /// MEDIUM and HIGH count as delayed.
    #[must_use]
    pub fn is_delayed(&self) -> bool {
        matches!(self, RiskLevel::Medium | RiskLevel::High)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// THRESHOLDS
// =============================================================================

/// Tunable risk thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Ceiling for variable transitions, in minutes.
    pub variable_ceiling_minutes: u32,
    /// Multiple of the expected duration that marks MEDIUM risk.
    pub medium_multiplier: u32,
    /// Multiple of the expected duration that marks HIGH risk.
    pub high_multiplier: u32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            variable_ceiling_minutes: VARIABLE_CEILING_MINUTES,
            medium_multiplier: MEDIUM_RISK_MULTIPLIER,
            high_multiplier: HIGH_RISK_MULTIPLIER,
        }
    }
}

impl RiskThresholds {
    #[must_use]
    pub fn new(variable_ceiling_minutes: u32, medium_multiplier: u32, high_multiplier: u32) -> Self {
        Self {
            variable_ceiling_minutes,
            medium_multiplier,
            high_multiplier,
        }
    }
}

/// `minutes * factor` as a delta, saturating instead of overflowing.
fn scaled_minutes(minutes: u32, factor: u32) -> TimeDelta {
    let total = i64::from(minutes).saturating_mul(i64::from(factor));
    TimeDelta::try_minutes(total).unwrap_or(TimeDelta::MAX)
}

// =============================================================================
// ELAPSED TIME
// =============================================================================

/// Time between the last scan and `now`. `None` for an empty history.
#[must_use]
pub fn time_since_last_scan(history: &[CheckpointEvent], now: DateTime<Utc>) -> Option<TimeDelta> {
    history
        .last()
        .map(|event| now.signed_duration_since(event.scanned_at))
}

/// Elapsed time as fractional minutes, for presentation only.
#[allow(clippy::float_arithmetic)]
#[must_use]
pub fn delta_as_minutes(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 60_000_000.0,
        None => delta.num_milliseconds() as f64 / 60_000.0,
    }
}

// =============================================================================
// RISK ASSESSOR
// =============================================================================

/// Risk Assessor - pure function from history and prediction to a risk level.
#[derive(Debug, Clone, Default)]
pub struct RiskAssessor {
    table: TransitionTable,
    thresholds: RiskThresholds,
}

impl RiskAssessor {
    /// Assessor with the default transition table and thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assessor with custom table and thresholds.
    #[must_use]
    pub fn with_config(table: TransitionTable, thresholds: RiskThresholds) -> Self {
        Self { table, thresholds }
    }

    #[must_use]
    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    #[must_use]
    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Assess delay risk for the transition out of the last scanned stage.
    ///
    /// LOW for an empty history or when no next stage is expected.
    #[must_use]
    pub fn assess(
        &self,
        history: &[CheckpointEvent],
        expected_next: Option<CheckpointStage>,
        now: DateTime<Utc>,
    ) -> RiskLevel {
        let Some(last) = history.last() else {
            return RiskLevel::Low;
        };
        let Some(next) = expected_next else {
            return RiskLevel::Low;
        };

        let elapsed = now.signed_duration_since(last.scanned_at);
        self.assess_elapsed(self.table.lookup(last.checkpoint, next), elapsed)
    }

    /// Score an elapsed time against one expected duration.
    #[must_use]
    pub fn assess_elapsed(&self, expected: ExpectedDuration, elapsed: TimeDelta) -> RiskLevel {
        match expected {
            ExpectedDuration::Variable => {
                if elapsed > scaled_minutes(self.thresholds.variable_ceiling_minutes, 1) {
                    RiskLevel::Medium
                } else {
                    RiskLevel::Low
                }
            }
            ExpectedDuration::Fixed(minutes) => {
                if elapsed > scaled_minutes(minutes, self.thresholds.high_multiplier) {
                    RiskLevel::High
                } else if elapsed > scaled_minutes(minutes, self.thresholds.medium_multiplier) {
                    RiskLevel::Medium
                } else {
                    RiskLevel::Low
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
