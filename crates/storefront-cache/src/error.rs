//! Store errors.

use thiserror::Error;

/// Failure of a cache read or write.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Value could not be encoded to or decoded from JSON.
    #[error("cache value encoding failed: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// The backing store rejected the operation.
    #[error("cache store failure: {0}")]
    StoreError(String),

    /// No document under the key.
    #[error("no cache entry for key {0}")]
    NotFound(String),

    /// A versioned write lost against another writer.
    #[error("cache entry changed concurrently: {0}")]
    ConcurrentModification(String),
}

impl CacheError {
    /// Whether retrying the read-modify-write cycle may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CacheError::ConcurrentModification(_))
    }
}
