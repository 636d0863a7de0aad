//! EVENTLOG - Custom Error Types
//! Defines the error hierarchy for the event store and its durable log.

use thiserror::Error;

/// Custom Result type for the event log.
pub type Result<T> = std::result::Result<T, EventLogError>;

/// Error types for the event log.
///
/// "Not found" is deliberately absent: lookups report it as `None` or an
/// empty list, so a variant here always means the backend failed.
#[derive(Error, Debug)]
pub enum EventLogError {
    /// I/O errors from file operations (WAL open, append, fsync).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data corruption detected (CRC mismatch in the middle of the log).
    #[error("Data corruption detected: {0}")]
    Corruption(String),

    /// WAL recovery failure.
    #[error("WAL recovery failed: {0}")]
    RecoveryFailed(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The WAL was left in an unknown state and accepts no more appends.
    #[error("WAL unusable: {0}")]
    WalFailed(String),

    /// A thread panicked while holding the store lock.
    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl From<bincode::Error> for EventLogError {
    fn from(err: bincode::Error) -> Self {
        EventLogError::Serialization(err.to_string())
    }
}
