//! # Checkpoint Stages
//!
//! The fixed, totally ordered sequence of operational checkpoints a bag moves
//! through, with a terminal subset.
//!
//! ## Stage Sequence
//!
//! | Index | Stage | Terminal |
//! |-------|-------|----------|
//! | 0 | CHECKIN | |
//! | 1 | SECURITY_CHECK | |
//! | 2 | TRANSFER | |
//! | 3 | LOADING | |
//! | 4 | LOADED_ONTO_AIRCRAFT | |
//! | 5 | IN_TRANSIT | |
//! | 6 | UNLOADING | |
//! | 7 | ARRIVAL | |
//! | 8 | CLAIMED | yes |
//! | 9 | LOST | yes |
//! | 10 | RETURNED_TO_AGENT | yes |
//!
//! Terminality is attached to each stage as metadata, never derived from its
//! position. Sequential successors inside the terminal tail (CLAIMED -> LOST)
//! exist only as index arithmetic; prediction goes through
//! [`expected_next_stage`], which checks the terminal flag first.

use crate::TrackerError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// =============================================================================
// STAGE ENUM
// =============================================================================

/// A named step in the operational lifecycle of a bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckpointStage {
    Checkin,
    SecurityCheck,
    Transfer,
    Loading,
    LoadedOntoAircraft,
    InTransit,
    Unloading,
    Arrival,
    Claimed,
    Lost,
    ReturnedToAgent,
}

impl CheckpointStage {
    /// Every stage in sequence order.
    pub const ALL: [CheckpointStage; 11] = [
        CheckpointStage::Checkin,
        CheckpointStage::SecurityCheck,
        CheckpointStage::Transfer,
        CheckpointStage::Loading,
        CheckpointStage::LoadedOntoAircraft,
        CheckpointStage::InTransit,
        CheckpointStage::Unloading,
        CheckpointStage::Arrival,
        CheckpointStage::Claimed,
        CheckpointStage::Lost,
        CheckpointStage::ReturnedToAgent,
    ];

    /// The first stage of every journey.
    pub const FIRST: CheckpointStage = CheckpointStage::Checkin;

    /// Zero-based position in the stage sequence.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            CheckpointStage::Checkin => 0,
            CheckpointStage::SecurityCheck => 1,
            CheckpointStage::Transfer => 2,
            CheckpointStage::Loading => 3,
            CheckpointStage::LoadedOntoAircraft => 4,
            CheckpointStage::InTransit => 5,
            CheckpointStage::Unloading => 6,
            CheckpointStage::Arrival => 7,
            CheckpointStage::Claimed => 8,
            CheckpointStage::Lost => 9,
            CheckpointStage::ReturnedToAgent => 10,
        }
    }

    /// Stage at the given sequence position, if any.
    #[must_use]
    pub fn from_index(index: usize) -> Option<CheckpointStage> {
        Self::ALL.get(index).copied()
    }

    /// Whether no further progression is expected once this stage is reached.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            CheckpointStage::Claimed | CheckpointStage::Lost | CheckpointStage::ReturnedToAgent
        )
    }

    /// Sequential successor, or `None` for the last element.
    ///
    /// This is raw index arithmetic and does not look at terminality.
    #[must_use]
    pub fn next_sequential(self) -> Option<CheckpointStage> {
        Self::from_index(self.index().saturating_add(1))
    }

    /// Canonical wire name, e.g. `SECURITY_CHECK`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            CheckpointStage::Checkin => "CHECKIN",
            CheckpointStage::SecurityCheck => "SECURITY_CHECK",
            CheckpointStage::Transfer => "TRANSFER",
            CheckpointStage::Loading => "LOADING",
            CheckpointStage::LoadedOntoAircraft => "LOADED_ONTO_AIRCRAFT",
            CheckpointStage::InTransit => "IN_TRANSIT",
            CheckpointStage::Unloading => "UNLOADING",
            CheckpointStage::Arrival => "ARRIVAL",
            CheckpointStage::Claimed => "CLAIMED",
            CheckpointStage::Lost => "LOST",
            CheckpointStage::ReturnedToAgent => "RETURNED_TO_AGENT",
        }
    }

    /// Human display form, e.g. `Security Check`.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            CheckpointStage::Checkin => "Checkin",
            CheckpointStage::SecurityCheck => "Security Check",
            CheckpointStage::Transfer => "Transfer",
            CheckpointStage::Loading => "Loading",
            CheckpointStage::LoadedOntoAircraft => "Loaded Onto Aircraft",
            CheckpointStage::InTransit => "In Transit",
            CheckpointStage::Unloading => "Unloading",
            CheckpointStage::Arrival => "Arrival",
            CheckpointStage::Claimed => "Claimed",
            CheckpointStage::Lost => "Lost",
            CheckpointStage::ReturnedToAgent => "Returned To Agent",
        }
    }
}

impl std::fmt::Display for CheckpointStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckpointStage {
    type Err = TrackerError;

    /// Parse a wire name. Case-insensitive; `-` and spaces are accepted in
    /// place of `_` so CLI input like `security-check` resolves.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();

        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| TrackerError::InvalidStage(s.to_string()))
    }
}

// =============================================================================
// STAGE METADATA LOOKUPS
// =============================================================================

/// Sequential successor of a stage, ignoring terminality.
#[must_use]
pub fn next_sequential_stage(stage: CheckpointStage) -> Option<CheckpointStage> {
    stage.next_sequential()
}

/// Whether a stage is terminal.
#[must_use]
pub fn is_terminal(stage: CheckpointStage) -> bool {
    stage.is_terminal()
}

/// Predict the stage expected to follow `current`.
///
/// `None` when nothing has been scanned yet, when the current stage is
/// terminal, or when it is the final sequence element.
#[must_use]
pub fn expected_next_stage(current: Option<CheckpointStage>) -> Option<CheckpointStage> {
    let current = current?;
    if current.is_terminal() {
        return None;
    }
    current.next_sequential()
}

// =============================================================================
// TESTS
// =============================================================================
