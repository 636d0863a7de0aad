//! EVENTLOG - Flagged Event-Log Service
//!
//! Clients submit batches of flagged, opaque-payload events, query them by id
//! or by flag, and delete them by id or by flag.
//!
//! ## Features
//! - **Validator**: drops candidates with no flags or no data, stamps missing timestamps
//! - **Slot model**: ids are stable positions; delete tombstones a slot, never frees it
//! - **Write-Ahead Log**: CRC32-framed records replayed on open
//! - **Backends**: in-memory `MemoryStore` and durable `LogStore` behind one `EventStore` trait
//! - **HTTP API**: axum router reporting `{"affectedlines": N}` for every mutation
//!
//! ## Example
//! ```no_run
//! use eventlog::store::{EventStore, MemoryStore};
//! use eventlog::types::Event;
//!
//! let store = MemoryStore::new();
//! let event = Event::new(chrono::Utc::now(), vec![7, 5], r#"{"location":"FR"}"#);
//! assert_eq!(store.register_new_events(vec![event]).unwrap(), 1);
//! assert_eq!(store.delete_by_id(1).unwrap(), 1);
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod store;
pub mod types;
pub mod validator;
