//! # Storage Module
//!
//! The append-only event store behind the tracker.
//!
//! Two backends implement [`EventStore`]:
//! - [`MemoryStore`]: BTreeMap-backed, for tests and ephemeral servers
//! - [`RedbStore`]: redb-backed, crash-safe, survives restarts
//!
//! Checkpoint events are never updated or deleted. `history` always returns
//! events ordered by scan time ascending; events with equal timestamps keep
//! the order in which they were appended.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::{Bag, BagId, CheckpointEvent, Scanner, ScannerId, TrackerError};

/// Record counts for a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub bags: usize,
    pub checkpoints: usize,
    pub scanners: usize,
}

/// Trait for event store backends.
pub trait EventStore {
    /// Persist a bag. Fails if the id is already taken.
    fn register_bag(&mut self, bag: Bag) -> Result<(), TrackerError>;

    /// Lookup a bag by id.
    fn get_bag(&self, id: &BagId) -> Result<Option<Bag>, TrackerError>;

    /// Append a checkpoint event. The bag must exist.
    fn append_checkpoint(&mut self, event: CheckpointEvent) -> Result<(), TrackerError>;

    /// All events of one bag, ordered by scan time ascending.
    ///
    /// An unknown bag has an empty history.
    fn history(&self, id: &BagId) -> Result<Vec<CheckpointEvent>, TrackerError>;

    /// The most recent event of one bag.
    fn latest_checkpoint(&self, id: &BagId) -> Result<Option<CheckpointEvent>, TrackerError> {
        Ok(self.history(id)?.pop())
    }

    /// Persist a scanner. Fails if the id is already taken.
    fn register_scanner(&mut self, scanner: Scanner) -> Result<(), TrackerError>;

    /// Lookup a scanner by id.
    fn get_scanner(&self, id: &ScannerId) -> Result<Option<Scanner>, TrackerError>;

    /// Scanners ordered by id, optionally restricted to active ones.
    fn list_scanners(&self, active_only: bool) -> Result<Vec<Scanner>, TrackerError>;

    /// Flip a scanner's active flag and return the updated record.
    fn set_scanner_active(
        &mut self,
        id: &ScannerId,
        active: bool,
    ) -> Result<Scanner, TrackerError>;

    /// Number of bags, events and scanners held.
    fn counts(&self) -> Result<StoreCounts, TrackerError>;
}

fn duplicate(kind: &str, id: &str) -> TrackerError {
    TrackerError::InvalidInput(format!("{} already exists: {}", kind, id))
}
