//! # Device-Local Key-Value Storage
//!
//! The offline queue and the citizen identity persist through a tiny
//! synchronous key-value interface so they can run against an in-memory
//! map in tests and against the filesystem on a device.
//!
//! ## Backends
//!
//! - `memory.rs`: `MemoryStore`, process-local and lost on exit
//! - `file.rs`: `FileStore`, one file per key under the app data directory
//!
//! ## Usage
//!
//! ```rust
//! use geoinfo::citizen_app::storage::{KeyValueStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set("citizen_device_id", "abc").unwrap();
//! assert_eq!(store.get("citizen_device_id").unwrap().as_deref(), Some("abc"));
//! ```

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failure (disk full, permissions…)
    #[error("storage I/O error on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Key contains characters the backend cannot represent
    #[error("invalid storage key: '{0}'")]
    InvalidKey(String),

    /// Backend is not usable at all
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key-value store with synchronous access
///
/// Implementations must make `set` durable before returning: callers rely
/// on a completed `set` surviving process termination.
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Read a value, `None` when the key was never written or was removed
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
