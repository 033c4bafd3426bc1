//! # History Interpretation
//!
//! Reading completed and current stages out of an ordered event history.
//!
//! History is taken at face value: impossible transitions (IN_TRANSIT then
//! CHECKIN, a scan after a terminal stage) are neither rejected nor repaired.

use crate::CheckpointEvent;
use crate::system::CheckpointStage;
use std::collections::BTreeSet;

/// Distinct stages in order of first occurrence.
///
/// Stages are never retracted: a LOST scan after ARRIVAL leaves ARRIVAL in
/// the list. Linear in history length.
#[must_use]
pub fn completed_stages(history: &[CheckpointEvent]) -> Vec<CheckpointStage> {
    let mut seen = BTreeSet::new();
    let mut completed = Vec::new();

    for event in history {
        if seen.insert(event.checkpoint) {
            completed.push(event.checkpoint);
        }
    }

    completed
}

/// Stage of the most recent event, terminal or not.
#[must_use]
pub fn current_stage(history: &[CheckpointEvent]) -> Option<CheckpointStage> {
    history.last().map(|event| event.checkpoint)
}
