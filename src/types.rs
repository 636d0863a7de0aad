//! EVENTLOG - Core Type Definitions
//! Defines the event record, its inbound candidate shape, and the slot state
//! that backs soft deletion.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of an event; also its 1-based slot position.
pub type EventId = i64;

/// Category tag carried by an event.
pub type Flag = i64;

/// Flag written into the tombstone view of a deleted slot.
pub const NEUTRAL_FLAG: Flag = -1;

/// Payload written into the tombstone view of a deleted slot.
pub const NEUTRAL_DATA: &str = "{}";

/// A persisted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub flags: Vec<Flag>,
    /// Opaque payload, never parsed by the store.
    pub data: String,
}

impl Event {
    /// Create an event that has not been assigned a slot yet.
    pub fn new(timestamp: DateTime<Utc>, flags: Vec<Flag>, data: impl Into<String>) -> Self {
        Self {
            id: 0,
            timestamp,
            flags,
            data: data.into(),
        }
    }

    /// The tombstone view of a deleted slot: epoch-zero time, flag `-1`, data `{}`.
    pub fn neutral(id: EventId) -> Self {
        Self {
            id,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            flags: vec![NEUTRAL_FLAG],
            data: NEUTRAL_DATA.to_string(),
        }
    }

    /// Returns true if this event is tagged with `flag`.
    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }
}

/// An event as submitted by a client, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateEvent {
    #[serde(deserialize_with = "null_as_default")]
    pub id: EventId,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub flags: Vec<Flag>,
    #[serde(deserialize_with = "null_as_default")]
    pub data: String,
}

/// `null` decodes to the empty value, like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl CandidateEvent {
    pub fn new(flags: Vec<Flag>, data: impl Into<String>) -> Self {
        Self {
            flags,
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// The timestamp, unless it is missing or the zero instant
    /// `0001-01-01T00:00:00Z`.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp.filter(|ts| !is_zero_instant(ts))
    }
}

fn is_zero_instant(ts: &DateTime<Utc>) -> bool {
    ts.year() == 1
        && ts.ordinal() == 1
        && ts.num_seconds_from_midnight() == 0
        && ts.nanosecond() == 0
}

/// State of one storage position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Active(Event),
    Deleted { id: EventId },
}

impl Slot {
    pub fn id(&self) -> EventId {
        match self {
            Slot::Active(event) => event.id,
            Slot::Deleted { id } => *id,
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Slot::Deleted { .. })
    }

    /// The active event, if the slot has not been tombstoned.
    pub fn active(&self) -> Option<&Event> {
        match self {
            Slot::Active(event) => Some(event),
            Slot::Deleted { .. } => None,
        }
    }

    /// Project the slot into the record clients see.
    pub fn to_event(&self) -> Event {
        match self {
            Slot::Active(event) => event.clone(),
            Slot::Deleted { id } => Event::neutral(*id),
        }
    }
}

/// Response body of every mutating call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedLines {
    pub affectedlines: usize,
}

impl From<usize> for AffectedLines {
    fn from(affectedlines: usize) -> Self {
        Self { affectedlines }
    }
}
