//! EVENTLOG - Store Metrics
//! Lock-free counters for store traffic, readable while requests are in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Atomic operation counters for an event store.
///
/// All counters use `Ordering::Relaxed`; they are for observation, not
/// synchronization.
#[derive(Debug)]
pub struct StoreMetrics {
    /// Events written to fresh slots.
    pub registered: AtomicU64,
    /// `get_event_by_id` calls.
    pub lookups: AtomicU64,
    /// Lookups that found no slot.
    pub misses: AtomicU64,
    /// `get_events_by_flag` calls.
    pub flag_queries: AtomicU64,
    /// `get_all_events` calls.
    pub scans: AtomicU64,
    /// Slots converted to tombstones.
    pub tombstones: AtomicU64,
    /// WAL records replayed at open.
    pub wal_records_replayed: AtomicU64,
    started: Instant,
}

impl StoreMetrics {
    pub fn new() -> Self {
        Self {
            registered: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            flag_queries: AtomicU64::new(0),
            scans: AtomicU64::new(0),
            tombstones: AtomicU64::new(0),
            wal_records_replayed: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn record_register(&self, count: usize) {
        self.registered.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_lookup(&self, hit: bool) {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if !hit {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_flag_query(&self) {
        self.flag_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tombstones(&self, count: usize) {
        self.tombstones.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_replay(&self, count: usize) {
        self.wal_records_replayed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Reads plus mutating calls' affected slots.
    pub fn total_ops(&self) -> u64 {
        self.registered.load(Ordering::Relaxed)
            + self.lookups.load(Ordering::Relaxed)
            + self.flag_queries.load(Ordering::Relaxed)
            + self.scans.load(Ordering::Relaxed)
            + self.tombstones.load(Ordering::Relaxed)
    }

    /// Format metrics as a human-readable report.
    pub fn report(&self) -> String {
        format!(
            "store metrics: registered={} lookups={} misses={} flag_queries={} scans={} \
             tombstones={} total_ops={} replayed={} uptime={:.2}s",
            self.registered.load(Ordering::Relaxed),
            self.lookups.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.flag_queries.load(Ordering::Relaxed),
            self.scans.load(Ordering::Relaxed),
            self.tombstones.load(Ordering::Relaxed),
            self.total_ops(),
            self.wal_records_replayed.load(Ordering::Relaxed),
            self.uptime_secs(),
        )
    }
}

impl Default for StoreMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_operations() {
        let m = StoreMetrics::new();

        m.record_register(3);
        m.record_lookup(true);
        m.record_lookup(false);
        m.record_flag_query();
        m.record_scan();
        m.record_tombstones(2);

        assert_eq!(m.registered.load(Ordering::Relaxed), 3);
        assert_eq!(m.lookups.load(Ordering::Relaxed), 2);
        assert_eq!(m.misses.load(Ordering::Relaxed), 1);
        assert_eq!(m.tombstones.load(Ordering::Relaxed), 2);
        assert_eq!(m.total_ops(), 9);
    }

    #[test]
    fn test_report_format() {
        let m = StoreMetrics::default();
        m.record_replay(4);
        let report = m.report();
        assert!(report.contains("replayed=4"));
        assert!(report.contains("tombstones=0"));
        assert!(report.contains("total_ops=0"));
    }
}
