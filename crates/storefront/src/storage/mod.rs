//! Durable key-value storage for the cart and ordering session.
//!
//! # Architecture
//!
//! - [`KeyValueStore`] is the backend seam. Backends report failures through
//!   [`StorageError`] and never panic.
//! - [`PersistenceGateway`] is what the rest of the crate uses. It serializes
//!   typed records, enforces session expiry and turns every storage failure
//!   into "absent" plus a `warn` log, because persistence is an optimization
//!   rather than a correctness requirement.
//!
//! # Backends
//!
//! - [`MemoryStore`] - in-process map, used by tests and short-lived hosts
//! - [`FileStore`] - one JSON file per key, used by the CLI

mod clock;
mod file;
mod gateway;
mod memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use file::FileStore;
pub use gateway::PersistenceGateway;
pub use memory::MemoryStore;

use thiserror::Error;

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backend cannot be used (disabled, poisoned, quota exceeded).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A string key-value store.
///
/// Implementations must be atomic per key; no cross-key coordination is
/// required by callers.
pub trait KeyValueStore: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
