//! EVENTLOG - Durable Log Store
//! Coordinates the write-ahead log and the slot table so that every
//! registration and tombstone survives a restart.
//!
//! The write path is WAL (disk) -> SlotTable (memory), under one write lock:
//! if the process dies between the two, replay reapplies the logged record.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::Config;
use crate::error::{EventLogError, Result};
use crate::types::{Event, EventId, Flag};

use super::metrics::StoreMetrics;
use super::slots::SlotTable;
use super::wal::{WalRecord, WriteAheadLog};
use super::EventStore;

/// File name of the write-ahead log inside the data directory.
pub const WAL_FILE_NAME: &str = "eventlog.wal";

struct LogState {
    slots: SlotTable,
    wal: WriteAheadLog,
}

/// Event store persisted to an append-only write-ahead log.
pub struct LogStore {
    state: RwLock<LogState>,
    metrics: StoreMetrics,
}

impl LogStore {
    /// Open or create a log store in the configured data directory,
    /// replaying any existing log.
    pub fn open(config: Config) -> Result<Self> {
        config.ensure_dirs()?;

        let wal_path = config.data_dir.join(WAL_FILE_NAME);
        let recovered = WriteAheadLog::recover(&wal_path)?;
        if recovered.has_torn_tail() {
            log::warn!(
                "Discarding {} bytes of torn WAL tail in {:?}",
                recovered.file_len - recovered.valid_len,
                wal_path
            );
            WriteAheadLog::truncate_to(&wal_path, recovered.valid_len)?;
        }

        let replayed = recovered.records.len();
        let slots = replay(recovered.records)?;
        let wal = WriteAheadLog::open(wal_path, config.sync_writes)?;

        let metrics = StoreMetrics::new();
        metrics.record_replay(replayed);

        log::info!(
            "Event log opened at {:?} ({} slots, {} records replayed)",
            config.data_dir,
            slots.len(),
            replayed
        );

        Ok(Self {
            state: RwLock::new(LogState { slots, wal }),
            metrics,
        })
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    /// Number of slots, tombstones included.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.slots.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.slots.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, LogState>> {
        self.state.read().map_err(|_| EventLogError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, LogState>> {
        self.state.write().map_err(|_| EventLogError::LockPoisoned)
    }
}

/// Rebuild the slot table from logged records.
fn replay(records: Vec<WalRecord>) -> Result<SlotTable> {
    let mut slots = SlotTable::new();
    for record in records {
        match record {
            WalRecord::Register(event) => {
                let expected = slots.next_id();
                if event.id != expected {
                    return Err(EventLogError::RecoveryFailed(format!(
                        "registration for id {} found where slot {} was expected",
                        event.id, expected
                    )));
                }
                slots.append(event);
            }
            WalRecord::Tombstone(id) => {
                if slots.get(id).is_none() {
                    return Err(EventLogError::RecoveryFailed(format!(
                        "tombstone for unknown id {}",
                        id
                    )));
                }
                slots.tombstone(id);
            }
        }
    }
    Ok(slots)
}

impl EventStore for LogStore {
    fn get_event_by_id(&self, id: EventId) -> Result<Option<Event>> {
        let event = self.read()?.slots.get(id).map(|slot| slot.to_event());
        self.metrics.record_lookup(event.is_some());
        Ok(event)
    }

    fn get_all_events(&self) -> Result<Vec<Event>> {
        self.metrics.record_scan();
        Ok(self.read()?.slots.scan())
    }

    fn get_events_by_flag(&self, flag: Flag) -> Result<Vec<Event>> {
        self.metrics.record_flag_query();
        Ok(self.read()?.slots.active_with_flag(flag))
    }

    fn register_new_events(&self, events: Vec<Event>) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut state = self.write()?;
        let first_id = state.slots.next_id();
        let records: Vec<WalRecord> = events
            .into_iter()
            .zip(first_id..)
            .map(|(mut event, id)| {
                event.id = id;
                WalRecord::Register(event)
            })
            .collect();

        state.wal.append_all(&records)?;

        let count = records.len();
        for record in records {
            if let WalRecord::Register(event) = record {
                state.slots.append(event);
            }
        }

        self.metrics.record_register(count);
        log::debug!("Registered {} events starting at id {}", count, first_id);
        Ok(count)
    }

    fn delete_by_id(&self, id: EventId) -> Result<usize> {
        let mut state = self.write()?;
        if !state.slots.is_active(id) {
            return Ok(0);
        }

        state.wal.append(&WalRecord::Tombstone(id))?;
        state.slots.tombstone(id);

        self.metrics.record_tombstones(1);
        log::debug!("Tombstoned event {}", id);
        Ok(1)
    }

    fn delete_by_flag(&self, flag: Flag) -> Result<usize> {
        let mut state = self.write()?;
        let ids = state.slots.active_ids_with_flag(flag);
        if ids.is_empty() {
            return Ok(0);
        }

        let records: Vec<WalRecord> = ids.iter().copied().map(WalRecord::Tombstone).collect();
        state.wal.append_all(&records)?;

        for id in &ids {
            state.slots.tombstone(*id);
        }

        self.metrics.record_tombstones(ids.len());
        log::debug!("Tombstoned {} events with flag {}", ids.len(), flag);
        Ok(ids.len())
    }
}
