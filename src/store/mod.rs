//! Result store for persisting job outputs
//!
//! Every successful job output is persisted under its job key and treated as
//! authoritative truth for that key for the rest of the run. A lookup miss is
//! an expected control path (it triggers a fetch), not an error, so `get`
//! returns `Ok(None)` rather than a failure.

mod fs;

pub use fs::FsStore;

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during store operations
///
/// These indicate a failing storage medium (disk full, permission denied,
/// corrupt entry). The store never retries on its own.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable key-to-value store for job outputs
///
/// Implementations must provide their own internal synchronization; workers
/// call into the store concurrently without taking external locks. A value
/// written by `put` is visible to every subsequent `get`.
pub trait ResultStore: Send + Sync {
    /// Looks up the persisted value for `key`
    ///
    /// Returns `Ok(None)` when no entry exists; that is the expected miss
    /// path, not an error.
    fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Persists `value` durably under `key`
    ///
    /// Creates any needed storage hierarchy. Overwrites are permitted but
    /// not expected in steady state.
    fn put(&self, key: &str, value: &Value) -> StoreResult<()>;
}
