//! EVENTLOG - In-Memory Store
//! Thread-safe slot table with no persistence.
//!
//! ## Concurrency Model
//! - **Read operations** (lookups, scans, flag queries) acquire a **read lock** (shared)
//! - **Write operations** (register, delete) acquire a **write lock** (exclusive)

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{EventLogError, Result};
use crate::types::{Event, EventId, Flag};

use super::metrics::StoreMetrics;
use super::slots::SlotTable;
use super::EventStore;

/// Event store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<SlotTable>,
    metrics: StoreMetrics,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store already holding `events`, registered in order.
    pub fn with_events(events: Vec<Event>) -> Self {
        let mut table = SlotTable::new();
        for event in events {
            table.append(event);
        }
        Self {
            slots: RwLock::new(table),
            metrics: StoreMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SlotTable>> {
        self.slots.read().map_err(|_| EventLogError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SlotTable>> {
        self.slots.write().map_err(|_| EventLogError::LockPoisoned)
    }
}

impl EventStore for MemoryStore {
    fn get_event_by_id(&self, id: EventId) -> Result<Option<Event>> {
        let event = self.read()?.get(id).map(|slot| slot.to_event());
        self.metrics.record_lookup(event.is_some());
        Ok(event)
    }

    fn get_all_events(&self) -> Result<Vec<Event>> {
        self.metrics.record_scan();
        Ok(self.read()?.scan())
    }

    fn get_events_by_flag(&self, flag: Flag) -> Result<Vec<Event>> {
        self.metrics.record_flag_query();
        Ok(self.read()?.active_with_flag(flag))
    }

    fn register_new_events(&self, events: Vec<Event>) -> Result<usize> {
        let count = events.len();
        let mut slots = self.write()?;
        for event in events {
            slots.append(event);
        }
        self.metrics.record_register(count);
        Ok(count)
    }

    fn delete_by_id(&self, id: EventId) -> Result<usize> {
        let changed = usize::from(self.write()?.tombstone(id));
        self.metrics.record_tombstones(changed);
        Ok(changed)
    }

    fn delete_by_flag(&self, flag: Flag) -> Result<usize> {
        let changed = self.write()?.tombstone_flag(flag);
        self.metrics.record_tombstones(changed);
        Ok(changed)
    }
}
