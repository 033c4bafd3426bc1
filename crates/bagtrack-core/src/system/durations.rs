//! # Expected Transition Durations
//!
//! How long a bag normally takes to move from one checkpoint to the next,
//! keyed by the ordered `(from, to)` pair.
//!
//! A transition is either [`ExpectedDuration::Fixed`] (policed against the
//! risk multipliers) or [`ExpectedDuration::Variable`] (only the fixed
//! ceiling applies). Pairs missing from the table resolve to `Variable`.

use crate::system::CheckpointStage;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Expected duration of a single stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedDuration {
    /// A fixed number of minutes (always > 0).
    Fixed(u32),
    /// Unbounded or length-dependent (e.g. flight time).
    Variable,
}

impl ExpectedDuration {
    /// Fixed duration as a time delta, `None` for variable transitions.
    #[must_use]
    pub fn as_delta(self) -> Option<TimeDelta> {
        match self {
            ExpectedDuration::Fixed(minutes) => Some(TimeDelta::minutes(i64::from(minutes))),
            ExpectedDuration::Variable => None,
        }
    }
}

/// Default transitions, in minutes. `None` marks a variable transition.
const DEFAULT_TRANSITIONS: [(CheckpointStage, CheckpointStage, Option<u32>); 8] = [
    (CheckpointStage::Checkin, CheckpointStage::SecurityCheck, Some(5)),
    (CheckpointStage::SecurityCheck, CheckpointStage::Transfer, Some(10)),
    (CheckpointStage::Transfer, CheckpointStage::Loading, Some(15)),
    (CheckpointStage::Loading, CheckpointStage::LoadedOntoAircraft, Some(5)),
    (CheckpointStage::LoadedOntoAircraft, CheckpointStage::InTransit, Some(30)),
    (CheckpointStage::InTransit, CheckpointStage::Unloading, None),
    (CheckpointStage::Unloading, CheckpointStage::Arrival, Some(10)),
    (CheckpointStage::Arrival, CheckpointStage::Claimed, Some(30)),
];

/// Lookup table of expected transition durations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    entries: BTreeMap<(CheckpointStage, CheckpointStage), ExpectedDuration>,
}

impl Default for TransitionTable {
    fn default() -> Self {
        let entries = DEFAULT_TRANSITIONS
            .iter()
            .map(|&(from, to, minutes)| {
                let duration = match minutes {
                    Some(m) => ExpectedDuration::Fixed(m),
                    None => ExpectedDuration::Variable,
                };
                ((from, to), duration)
            })
            .collect();
        Self { entries }
    }
}

impl TransitionTable {
    /// Table with the default airport timings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with no entries; every transition is variable.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Set the expected duration for a transition.
    ///
    /// A `Fixed(0)` duration is stored as `Variable`: a zero budget cannot be
    /// scaled into a meaningful threshold.
    pub fn set(&mut self, from: CheckpointStage, to: CheckpointStage, duration: ExpectedDuration) {
        let duration = match duration {
            ExpectedDuration::Fixed(0) => ExpectedDuration::Variable,
            other => other,
        };
        self.entries.insert((from, to), duration);
    }

    /// Builder form of [`TransitionTable::set`].
    #[must_use]
    pub fn with(
        mut self,
        from: CheckpointStage,
        to: CheckpointStage,
        duration: ExpectedDuration,
    ) -> Self {
        self.set(from, to, duration);
        self
    }

    /// Expected duration for `from -> to`. Missing pairs are variable.
    #[must_use]
    pub fn lookup(&self, from: CheckpointStage, to: CheckpointStage) -> ExpectedDuration {
        self.entries
            .get(&(from, to))
            .copied()
            .unwrap_or(ExpectedDuration::Variable)
    }

    /// Iterate entries in `(from, to)` order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (CheckpointStage, CheckpointStage, ExpectedDuration)> + '_ {
        self.entries.iter().map(|(&(from, to), &d)| (from, to, d))
    }

    /// Number of explicit entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no explicit entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
