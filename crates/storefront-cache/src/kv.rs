//! Key-Value store with automatic serialization and per-key versions.

use crate::CacheError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Maximum retry attempts for optimistic concurrency control.
pub const MAX_UPDATE_RETRIES: u32 = 3;

/// A stored value together with the version it was read at.
///
/// Version `0` is never stored; it stands for "key absent" when passed to
/// [`Cache::set_if_version`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// Version of the document.
    pub version: u64,
    /// The document.
    pub value: T,
}

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    version: u64,
}

/// Type-safe document cache.
///
/// Values are stored as JSON. Cloning a `Cache` yields another handle to
/// the same underlying store.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl Cache {
    /// Create an empty in-memory store.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Get a value from the cache.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let cart: Option<Cart> = cache.get("cart:user:123")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        Ok(self.get_versioned(key)?.map(|v| v.value))
    }

    /// Get a value along with its current version.
    pub fn get_versioned<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<Versioned<T>>, CacheError> {
        let entries = self.read()?;
        match entries.get(key) {
            Some(entry) => {
                let value: T = serde_json::from_slice(&entry.bytes)?;
                Ok(Some(Versioned {
                    version: entry.version,
                    value,
                }))
            }
            None => Ok(None),
        }
    }

    /// Set a value in the cache (unconditional write).
    ///
    /// Returns the new version of the key.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<u64, CacheError> {
        let bytes = serde_json::to_vec(value)?;
        let mut entries = self.write()?;
        let version = entries.get(key).map(|e| e.version + 1).unwrap_or(1);
        entries.insert(key.to_string(), Entry { bytes, version });
        Ok(version)
    }

    /// Write a value only if the key is still at `expected_version`.
    ///
    /// Pass `0` to require that the key does not exist yet. Returns the new
    /// version, or `CacheError::ConcurrentModification` if another writer
    /// got in first.
    pub fn set_if_version<T: Serialize>(
        &self,
        key: &str,
        expected_version: u64,
        value: &T,
    ) -> Result<u64, CacheError> {
        let bytes = serde_json::to_vec(value)?;
        let mut entries = self.write()?;
        let current = entries.get(key).map(|e| e.version).unwrap_or(0);
        if current != expected_version {
            return Err(CacheError::ConcurrentModification(format!(
                "{key}: expected version {expected_version}, found {current}"
            )));
        }
        let version = current + 1;
        entries.insert(key.to_string(), Entry { bytes, version });
        Ok(version)
    }

    /// Update a value with a closure, using optimistic concurrency control.
    ///
    /// The closure receives the current value (or `None`) and returns the
    /// value to write. If another writer changes the key between the read
    /// and the write, the closure runs again, up to `MAX_UPDATE_RETRIES`
    /// times. An error from the closure aborts without writing.
    pub fn update<T, E, F>(&self, key: &str, mut f: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnMut(Option<T>) -> Result<T, E>,
    {
        for _attempt in 0..MAX_UPDATE_RETRIES {
            let (current, expected_version) = match self.get_versioned::<T>(key)? {
                Some(v) => (Some(v.value), v.version),
                None => (None, 0),
            };

            let next = f(current)?;

            match self.set_if_version(key, expected_version, &next) {
                Ok(_) => return Ok(next),
                Err(e) if e.is_conflict() => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(CacheError::ConcurrentModification(format!("{key}: max retries exceeded")).into())
    }

    /// Delete a value from the cache.
    pub fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.write()?.remove(key);
        Ok(())
    }

    /// Check if a key exists in the cache.
    pub fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.read()?.contains_key(key))
    }

    /// Get all keys in the cache.
    pub fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut keys: Vec<String> = self.read()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// Get all keys starting with `prefix`, sorted.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let mut keys: Vec<String> = self
            .read()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries
            .read()
            .map_err(|_| CacheError::StoreError("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries
            .write()
            .map_err(|_| CacheError::StoreError("store lock poisoned".to_string()))
    }
}

/// Helper to build cache keys with namespacing.
///
/// # Example
///
/// ```rust
/// use storefront_cache::cache_key;
///
/// let key = cache_key!("cart", "user", "u-123");
/// assert_eq!(key, "cart:user:u-123");
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        used: u32,
        max: u32,
    }

    #[test]
    fn test_get_missing_key() {
        let cache = Cache::in_memory();
        let value: Option<String> = cache.get("missing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_set_and_get() {
        let cache = Cache::in_memory();
        cache.set("greeting", &"hello".to_string()).unwrap();
        let value: Option<String> = cache.get("greeting").unwrap();
        assert_eq!(value.as_deref(), Some("hello"));
    }

    #[test]
    fn test_versions_increment() {
        let cache = Cache::in_memory();
        assert_eq!(cache.set("k", &1).unwrap(), 1);
        assert_eq!(cache.set("k", &2).unwrap(), 2);
        let v: Versioned<i32> = cache.get_versioned("k").unwrap().unwrap();
        assert_eq!(v.version, 2);
        assert_eq!(v.value, 2);
    }

    #[test]
    fn test_set_if_version_rejects_stale_writer() {
        let cache = Cache::in_memory();
        cache.set("k", &1).unwrap();

        assert!(cache.set_if_version("k", 1, &2).is_ok());
        let stale = cache.set_if_version("k", 1, &3);
        assert!(matches!(stale, Err(CacheError::ConcurrentModification(_))));

        let value: Option<i32> = cache.get("k").unwrap();
        assert_eq!(value, Some(2));
    }

    #[test]
    fn test_set_if_version_zero_means_absent() {
        let cache = Cache::in_memory();
        assert_eq!(cache.set_if_version("new", 0, &"a").unwrap(), 1);
        assert!(cache.set_if_version("new", 0, &"b").is_err());
    }

    #[test]
    fn test_update_applies_closure() {
        let cache = Cache::in_memory();
        cache.set("c", &Counter { used: 0, max: 2 }).unwrap();

        let updated: Result<Counter, CacheError> = cache.update("c", |current: Option<Counter>| {
            let mut c = current.ok_or_else(|| CacheError::NotFound("c".into()))?;
            c.used += 1;
            Ok(c)
        });

        assert_eq!(updated.unwrap().used, 1);
        let stored: Counter = cache.get("c").unwrap().unwrap();
        assert_eq!(stored.used, 1);
    }

    #[test]
    fn test_update_error_does_not_write() {
        let cache = Cache::in_memory();
        cache.set("c", &Counter { used: 2, max: 2 }).unwrap();

        let result: Result<Counter, CacheError> = cache.update("c", |current: Option<Counter>| {
            let c = current.ok_or_else(|| CacheError::NotFound("c".into()))?;
            if c.used >= c.max {
                return Err(CacheError::StoreError("limit reached".into()));
            }
            Ok(c)
        });

        assert!(result.is_err());
        let v: Versioned<Counter> = cache.get_versioned("c").unwrap().unwrap();
        assert_eq!(v.version, 1);
    }

    #[test]
    fn test_clones_share_state() {
        let cache = Cache::in_memory();
        let other = cache.clone();
        cache.set("shared", &true).unwrap();
        assert!(other.exists("shared").unwrap());
    }

    #[test]
    fn test_delete_and_keys() {
        let cache = Cache::in_memory();
        cache.set("cart:a", &1).unwrap();
        cache.set("cart:b", &2).unwrap();
        cache.set("order:x", &3).unwrap();

        assert_eq!(cache.keys_with_prefix("cart:").unwrap(), vec!["cart:a", "cart:b"]);

        cache.delete("cart:a").unwrap();
        assert!(!cache.exists("cart:a").unwrap());
        assert_eq!(cache.keys().unwrap().len(), 2);
    }

    #[test]
    fn test_cache_key_macro() {
        let key = cache_key!("discount", "SAVE5");
        assert_eq!(key, "discount:SAVE5");
    }

    #[test]
    fn test_concurrent_updates_are_serialized() {
        let cache = Cache::in_memory();
        cache.set("n", &0u32).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        loop {
                            let r: Result<u32, CacheError> =
                                cache.update("n", |v: Option<u32>| Ok(v.unwrap_or(0) + 1));
                            if r.is_ok() {
                                break;
                            }
                        }
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        let n: u32 = cache.get("n").unwrap().unwrap();
        assert_eq!(n, 40);
    }
}
