//! EVENTLOG - Event Store Module
//! The store contract plus its two backends: an in-memory table and a
//! WAL-backed durable log.

pub mod log_store;
pub mod memory;
pub mod metrics;
pub mod slots;
pub mod wal;

use crate::error::Result;
use crate::types::{Event, EventId, Flag};

pub use self::log_store::LogStore;
pub use self::memory::MemoryStore;

/// Durable mapping from event id to event record.
///
/// Every call is atomic with respect to the slots it reads or changes.
/// `Err` always means the backend failed; absence is `None` or an empty list.
pub trait EventStore: Send + Sync {
    /// The slot for `id`, as an active event or its tombstone view.
    fn get_event_by_id(&self, id: EventId) -> Result<Option<Event>>;

    /// Every slot, tombstones included, in storage order.
    fn get_all_events(&self) -> Result<Vec<Event>>;

    /// Active events tagged with `flag`, in storage order.
    fn get_events_by_flag(&self, flag: Flag) -> Result<Vec<Event>>;

    /// Append already-validated events to fresh slots. Input ids are
    /// ignored; each event takes its slot's position as id.
    /// Returns the number of slots created.
    fn register_new_events(&self, events: Vec<Event>) -> Result<usize>;

    /// Tombstone the slot for `id`. Returns 1 if an active event was
    /// deleted, 0 if the id is unknown or already deleted.
    fn delete_by_id(&self, id: EventId) -> Result<usize>;

    /// Tombstone every active event tagged with `flag`.
    /// Returns the number of slots changed.
    fn delete_by_flag(&self, flag: Flag) -> Result<usize>;
}
