//! EVENTLOG - Slot Table (In-Memory Position Index)
//! Every registered event occupies one slot, numbered from 1 in registration
//! order. Deleting an event replaces its slot with a tombstone; slots are
//! never freed or renumbered.

use crate::types::{Event, EventId, Flag, Slot};

/// Position-indexed event slots shared by every store backend.
#[derive(Debug, Default)]
pub struct SlotTable {
    /// `slots[i]` holds the event with id `i + 1`.
    slots: Vec<Slot>,
}

impl SlotTable {
    /// Create a new, empty SlotTable.
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Returns the number of slots, tombstones included.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no event was ever registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Id the next appended event will receive.
    pub fn next_id(&self) -> EventId {
        self.slots.len() as EventId + 1
    }

    /// Append an event to a fresh slot, overwriting its id with the slot's.
    pub fn append(&mut self, mut event: Event) -> EventId {
        let id = self.next_id();
        event.id = id;
        self.slots.push(Slot::Active(event));
        id
    }

    /// Look up the slot for `id`.
    pub fn get(&self, id: EventId) -> Option<&Slot> {
        Self::index_of(id).and_then(|idx| self.slots.get(idx))
    }

    /// Every slot projected to its client view, in storage order.
    pub fn scan(&self) -> Vec<Event> {
        self.slots.iter().map(Slot::to_event).collect()
    }

    /// Active events tagged with `flag`, in storage order.
    pub fn active_with_flag(&self, flag: Flag) -> Vec<Event> {
        self.slots
            .iter()
            .filter_map(Slot::active)
            .filter(|event| event.has_flag(flag))
            .cloned()
            .collect()
    }

    /// Ids of active events tagged with `flag`, in storage order.
    pub fn active_ids_with_flag(&self, flag: Flag) -> Vec<EventId> {
        self.slots
            .iter()
            .filter_map(Slot::active)
            .filter(|event| event.has_flag(flag))
            .map(|event| event.id)
            .collect()
    }

    /// Returns true if `id` holds an active (not tombstoned) event.
    pub fn is_active(&self, id: EventId) -> bool {
        matches!(self.get(id), Some(Slot::Active(_)))
    }

    /// Tombstone the slot for `id`.
    /// Returns false when the slot is unknown or already deleted.
    pub fn tombstone(&mut self, id: EventId) -> bool {
        let Some(slot) = Self::index_of(id).and_then(|idx| self.slots.get_mut(idx)) else {
            return false;
        };
        if slot.is_deleted() {
            return false;
        }
        *slot = Slot::Deleted { id };
        true
    }

    /// Tombstone every active event tagged with `flag`.
    /// Returns the number of slots changed.
    pub fn tombstone_flag(&mut self, flag: Flag) -> usize {
        let mut changed = 0;
        for slot in self.slots.iter_mut() {
            let id = match slot {
                Slot::Active(event) if event.has_flag(flag) => event.id,
                _ => continue,
            };
            *slot = Slot::Deleted { id };
            changed += 1;
        }
        changed
    }

    fn index_of(id: EventId) -> Option<usize> {
        usize::try_from(id).ok()?.checked_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(flags: Vec<Flag>, data: &str) -> Event {
        Event::new(Utc.timestamp_opt(1605107095, 0).unwrap(), flags, data)
    }

    fn table_with(events: Vec<Event>) -> SlotTable {
        let mut table = SlotTable::new();
        for e in events {
            table.append(e);
        }
        table
    }

    #[test]
    fn test_append_assigns_positions() {
        let mut table = SlotTable::new();
        assert_eq!(table.append(event(vec![1], "a")), 1);
        assert_eq!(table.append(event(vec![1], "b")), 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(2).unwrap().id(), 2);
    }

    #[test]
    fn test_get_out_of_range() {
        let table = table_with(vec![event(vec![1], "a")]);
        assert!(table.get(0).is_none());
        assert!(table.get(-4).is_none());
        assert!(table.get(2).is_none());
    }

    #[test]
    fn test_tombstone_keeps_slot() {
        let mut table = table_with(vec![event(vec![1], "a"), event(vec![2], "b")]);

        assert!(table.tombstone(1));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1), Some(&Slot::Deleted { id: 1 }));
        assert!(table.is_active(2));
    }

    #[test]
    fn test_tombstone_is_idempotent() {
        let mut table = table_with(vec![event(vec![1], "a")]);
        assert!(table.tombstone(1));
        assert!(!table.tombstone(1));
        assert!(!table.tombstone(9));
    }

    #[test]
    fn test_flag_filter_skips_tombstones() {
        let mut table = table_with(vec![
            event(vec![7, 5], "a"),
            event(vec![15, 2, 8], "b"),
            event(vec![8], "c"),
        ]);
        table.tombstone(3);

        let hits = table.active_with_flag(8);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].data, "b");
        assert!(table.active_with_flag(9).is_empty());
        // the tombstone view carries -1, which must never match a query
        assert!(table.active_with_flag(-1).is_empty());
    }

    #[test]
    fn test_tombstone_flag_counts_changes() {
        let mut table = table_with(vec![
            event(vec![1, 2], "a"),
            event(vec![2], "b"),
            event(vec![3], "c"),
        ]);

        assert_eq!(table.active_ids_with_flag(2), vec![1, 2]);
        assert_eq!(table.tombstone_flag(2), 2);
        assert_eq!(table.tombstone_flag(2), 0);
        assert!(table.is_active(3));
    }

    #[test]
    fn test_scan_projects_tombstones() {
        let mut table = table_with(vec![event(vec![1], "a"), event(vec![2], "b")]);
        table.tombstone(2);

        let all = table.scan();
        assert_eq!(all[0].data, "a");
        assert_eq!(all[1], Event::neutral(2));
    }
}
