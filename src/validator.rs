//! EVENTLOG - Batch Validator
//! Filters an inbound batch down to storable events before it reaches a store.

use std::sync::Arc;

use crate::clock::Clock;
use crate::types::{CandidateEvent, Event};

/// Drops unusable candidates and stamps missing timestamps.
#[derive(Clone)]
pub struct Validator {
    clock: Arc<dyn Clock>,
}

impl Validator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Validate a batch.
    ///
    /// Candidates with empty `data` or no `flags` are dropped silently.
    /// Survivors keep their relative order; those without a timestamp get
    /// the clock's current time. Output ids are left at 0 for the store to
    /// assign.
    pub fn validate(&self, batch: Vec<CandidateEvent>) -> Vec<Event> {
        let submitted = batch.len();

        let events: Vec<Event> = batch
            .into_iter()
            .filter_map(|candidate| {
                if candidate.data.is_empty() || candidate.flags.is_empty() {
                    log::debug!(
                        "Dropping candidate (flags={:?}, data_len={})",
                        candidate.flags,
                        candidate.data.len()
                    );
                    return None;
                }

                let timestamp = candidate
                    .effective_timestamp()
                    .unwrap_or_else(|| self.clock.now());

                Some(Event::new(timestamp, candidate.flags, candidate.data))
            })
            .collect();

        log::debug!("Validated batch: {} of {} accepted", events.len(), submitted);
        events
    }
}
