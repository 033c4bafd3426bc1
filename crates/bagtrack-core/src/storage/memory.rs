//! In-memory event store.

use super::{EventStore, StoreCounts, duplicate};
use crate::{Bag, BagId, CheckpointEvent, Scanner, ScannerId, TrackerError};
use std::collections::BTreeMap;

/// BTreeMap-backed store. Iteration order is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    bags: BTreeMap<BagId, Bag>,
    checkpoints: BTreeMap<BagId, Vec<CheckpointEvent>>,
    scanners: BTreeMap<ScannerId, Scanner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for MemoryStore {
    fn register_bag(&mut self, bag: Bag) -> Result<(), TrackerError> {
        if self.bags.contains_key(&bag.id) {
            return Err(duplicate("bag", bag.id.as_str()));
        }
        self.bags.insert(bag.id.clone(), bag);
        Ok(())
    }

    fn get_bag(&self, id: &BagId) -> Result<Option<Bag>, TrackerError> {
        Ok(self.bags.get(id).cloned())
    }

    fn append_checkpoint(&mut self, event: CheckpointEvent) -> Result<(), TrackerError> {
        if !self.bags.contains_key(&event.bag_id) {
            return Err(TrackerError::BagNotFound(event.bag_id));
        }
        let events = self.checkpoints.entry(event.bag_id.clone()).or_default();
        // Insert after every event with an equal or earlier timestamp.
        let pos = events.partition_point(|e| e.scanned_at <= event.scanned_at);
        events.insert(pos, event);
        Ok(())
    }

    fn history(&self, id: &BagId) -> Result<Vec<CheckpointEvent>, TrackerError> {
        Ok(self.checkpoints.get(id).cloned().unwrap_or_default())
    }

    fn latest_checkpoint(&self, id: &BagId) -> Result<Option<CheckpointEvent>, TrackerError> {
        Ok(self.checkpoints.get(id).and_then(|events| events.last().cloned()))
    }

    fn register_scanner(&mut self, scanner: Scanner) -> Result<(), TrackerError> {
        if self.scanners.contains_key(&scanner.id) {
            return Err(duplicate("scanner", scanner.id.as_str()));
        }
        self.scanners.insert(scanner.id.clone(), scanner);
        Ok(())
    }

    fn get_scanner(&self, id: &ScannerId) -> Result<Option<Scanner>, TrackerError> {
        Ok(self.scanners.get(id).cloned())
    }

    fn list_scanners(&self, active_only: bool) -> Result<Vec<Scanner>, TrackerError> {
        Ok(self
            .scanners
            .values()
            .filter(|s| !active_only || s.is_active)
            .cloned()
            .collect())
    }

    fn set_scanner_active(
        &mut self,
        id: &ScannerId,
        active: bool,
    ) -> Result<Scanner, TrackerError> {
        let scanner = self
            .scanners
            .get_mut(id)
            .ok_or_else(|| TrackerError::ScannerNotFound(id.clone()))?;
        scanner.is_active = active;
        Ok(scanner.clone())
    }

    fn counts(&self) -> Result<StoreCounts, TrackerError> {
        Ok(StoreCounts {
            bags: self.bags.len(),
            checkpoints: self.checkpoints.values().map(Vec::len).sum(),
            scanners: self.scanners.len(),
        })
    }
}
