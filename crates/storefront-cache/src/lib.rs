//! Versioned key-value document store for Storefront.
//!
//! Documents are stored as JSON under string keys. Every write bumps a
//! per-key version so callers can do optimistic read-modify-write cycles
//! with [`Cache::set_if_version`] or [`Cache::update`].
//!
//! # Example
//!
//! ```rust
//! use storefront_cache::{cache_key, Cache};
//!
//! let cache = Cache::in_memory();
//! let key = cache_key!("cart", "user", "u-1");
//!
//! cache.set(&key, &vec![1, 2, 3]).unwrap();
//! let items: Option<Vec<i32>> = cache.get(&key).unwrap();
//! assert_eq!(items, Some(vec![1, 2, 3]));
//! ```

mod error;
mod kv;

pub use error::CacheError;
pub use kv::{Cache, Versioned, MAX_UPDATE_RETRIES};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{cache_key, Cache, CacheError, Versioned};
}
