//! # redb-backed Event Store
//!
//! A disk-backed event store using the redb embedded database.
//!
//! Records are postcard-encoded. Checkpoint events are keyed by
//! `(bag_id, seconds, nanoseconds, sequence)`, so one bag's history is a single
//! ordered range scan and ties on the timestamp fall back to append order.

use super::{EventStore, StoreCounts, duplicate};
use crate::{Bag, BagId, CheckpointEvent, Scanner, ScannerId, TrackerError};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ops::RangeInclusive;
use std::path::Path;

/// Table for bags: BagId -> serialized Bag
const BAGS: TableDefinition<&str, &[u8]> = TableDefinition::new("bags");

/// Table for events: (bag_id, scanned_at secs, subsec nanos, seq) -> serialized CheckpointEvent
///
/// The full nanosecond instant is part of the key so ordering matches the
/// in-memory store exactly; `seq` only breaks exact ties.
const CHECKPOINTS: TableDefinition<(&str, i64, u32, u64), &[u8]> =
    TableDefinition::new("checkpoints");

/// Table for scanners: ScannerId -> serialized Scanner
const SCANNERS: TableDefinition<&str, &[u8]> = TableDefinition::new("scanners");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const NEXT_SEQ_KEY: &str = "next_event_seq";

type CheckpointKey<'a> = (&'a str, i64, u32, u64);

/// Every checkpoint key of one bag.
fn bag_range(bag_id: &str) -> RangeInclusive<CheckpointKey<'_>> {
    (bag_id, i64::MIN, 0, 0)..=(bag_id, i64::MAX, u32::MAX, u64::MAX)
}

fn io_err(e: impl std::fmt::Display) -> TrackerError {
    TrackerError::IoError(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, TrackerError> {
    postcard::to_allocvec(value).map_err(|e| TrackerError::SerializationError(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TrackerError> {
    postcard::from_bytes(bytes).map_err(|e| TrackerError::SerializationError(e.to_string()))
}

/// A disk-backed event store using redb.
pub struct RedbStore {
    db: Database,
    /// Next append sequence number; breaks timestamp ties.
    next_seq: u64,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("next_seq", &self.next_seq)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(BAGS).map_err(io_err)?;
            let _ = write_txn.open_table(CHECKPOINTS).map_err(io_err)?;
            let _ = write_txn.open_table(SCANNERS).map_err(io_err)?;
            let _ = write_txn.open_table(METADATA).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        let next_seq = {
            let read_txn = db.begin_read().map_err(io_err)?;
            let table = read_txn.open_table(METADATA).map_err(io_err)?;
            table
                .get(NEXT_SEQ_KEY)
                .map_err(io_err)?
                .map(|v| v.value())
                .unwrap_or(0)
        };

        Ok(Self { db, next_seq })
    }
}

impl EventStore for RedbStore {
    fn register_bag(&mut self, bag: Bag) -> Result<(), TrackerError> {
        let bytes = encode(&bag)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(BAGS).map_err(io_err)?;
            if table.get(bag.id.as_str()).map_err(io_err)?.is_some() {
                return Err(duplicate("bag", bag.id.as_str()));
            }
            table
                .insert(bag.id.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn get_bag(&self, id: &BagId) -> Result<Option<Bag>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(BAGS).map_err(io_err)?;
        match table.get(id.as_str()).map_err(io_err)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn append_checkpoint(&mut self, event: CheckpointEvent) -> Result<(), TrackerError> {
        let bytes = encode(&event)?;
        let seq = self.next_seq;
        let next_seq = seq.saturating_add(1);

        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let bags = write_txn.open_table(BAGS).map_err(io_err)?;
            if bags.get(event.bag_id.as_str()).map_err(io_err)?.is_none() {
                return Err(TrackerError::BagNotFound(event.bag_id));
            }
        }
        {
            let mut table = write_txn.open_table(CHECKPOINTS).map_err(io_err)?;
            let key = (
                event.bag_id.as_str(),
                event.scanned_at.timestamp(),
                event.scanned_at.timestamp_subsec_nanos(),
                seq,
            );
            table.insert(key, bytes.as_slice()).map_err(io_err)?;
        }
        {
            let mut meta = write_txn.open_table(METADATA).map_err(io_err)?;
            meta.insert(NEXT_SEQ_KEY, next_seq).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        self.next_seq = next_seq;
        Ok(())
    }

    fn history(&self, id: &BagId) -> Result<Vec<CheckpointEvent>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CHECKPOINTS).map_err(io_err)?;

        let mut events = Vec::new();
        for entry in table
            .range(bag_range(id.as_str()))
            .map_err(io_err)?
        {
            let (_key, value) = entry.map_err(io_err)?;
            events.push(decode(value.value())?);
        }
        Ok(events)
    }

    fn latest_checkpoint(&self, id: &BagId) -> Result<Option<CheckpointEvent>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(CHECKPOINTS).map_err(io_err)?;

        let last = table
            .range(bag_range(id.as_str()))
            .map_err(io_err)?
            .next_back();
        match last {
            Some(entry) => {
                let (_key, value) = entry.map_err(io_err)?;
                Ok(Some(decode(value.value())?))
            }
            None => Ok(None),
        }
    }

    fn register_scanner(&mut self, scanner: Scanner) -> Result<(), TrackerError> {
        let bytes = encode(&scanner)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(SCANNERS).map_err(io_err)?;
            if table.get(scanner.id.as_str()).map_err(io_err)?.is_some() {
                return Err(duplicate("scanner", scanner.id.as_str()));
            }
            table
                .insert(scanner.id.as_str(), bytes.as_slice())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn get_scanner(&self, id: &ScannerId) -> Result<Option<Scanner>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SCANNERS).map_err(io_err)?;
        match table.get(id.as_str()).map_err(io_err)? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn list_scanners(&self, active_only: bool) -> Result<Vec<Scanner>, TrackerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(SCANNERS).map_err(io_err)?;

        let mut scanners = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_key, value) = entry.map_err(io_err)?;
            let scanner: Scanner = decode(value.value())?;
            if !active_only || scanner.is_active {
                scanners.push(scanner);
            }
        }
        Ok(scanners)
    }

    fn set_scanner_active(
        &mut self,
        id: &ScannerId,
        active: bool,
    ) -> Result<Scanner, TrackerError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        let scanner = {
            let mut table = write_txn.open_table(SCANNERS).map_err(io_err)?;
            let existing = table
                .get(id.as_str())
                .map_err(io_err)?
                .map(|guard| guard.value().to_vec());
            let Some(bytes) = existing else {
                return Err(TrackerError::ScannerNotFound(id.clone()));
            };

            let mut scanner: Scanner = decode(&bytes)?;
            scanner.is_active = active;
            let updated = encode(&scanner)?;
            table
                .insert(id.as_str(), updated.as_slice())
                .map_err(io_err)?;
            scanner
        };
        write_txn.commit().map_err(io_err)?;
        Ok(scanner)
    }

    fn counts(&self) -> Result<StoreCounts, TrackerError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let bags = read_txn.open_table(BAGS).map_err(io_err)?.len().map_err(io_err)?;
        let checkpoints = read_txn
            .open_table(CHECKPOINTS)
            .map_err(io_err)?
            .len()
            .map_err(io_err)?;
        let scanners = read_txn
            .open_table(SCANNERS)
            .map_err(io_err)?
            .len()
            .map_err(io_err)?;

        Ok(StoreCounts {
            bags: bags as usize,
            checkpoints: checkpoints as usize,
            scanners: scanners as usize,
        })
    }
}
