//! In-process memoization keyed by md5 digests.
//!
//! Entries are never evicted: the caches hold a handful of engines and answers
//! per session, so growth is bounded by user activity. [`MemoCache::clear`]
//! drops everything, e.g. after a configuration change.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheResult<T> {
    /// Item was found
    Hit(T),

    /// Item was not found
    Miss,
}

/// Build a cache key from an ordered list of parts.
///
/// Each part is length-prefixed before hashing so that `["ab", "c"]` and
/// `["a", "bc"]` produce different keys.
pub fn cache_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut input = String::new();
    for part in parts {
        let part = part.as_ref();
        input.push_str(&part.len().to_string());
        input.push(':');
        input.push_str(part);
        input.push('|');
    }

    let digest = md5::compute(input.as_bytes());
    format!("{:x}", digest)
}

/// Unbounded key-value memo cache
#[derive(Debug)]
pub struct MemoCache<V> {
    name: &'static str,
    entries: Mutex<HashMap<String, V>>,
}

impl<V: Clone> MemoCache<V> {
    /// Create an empty cache; `name` is used in log messages
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, V>> {
        // Values are only ever inserted whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> CacheResult<V> {
        match self.lock().get(key) {
            Some(value) => {
                tracing::debug!("Cache HIT for {}: {}", self.name, key);
                CacheResult::Hit(value.clone())
            }
            None => {
                tracing::debug!("Cache MISS for {}: {}", self.name, key);
                CacheResult::Miss
            }
        }
    }

    /// Store a value, replacing any previous value for the key
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.lock().insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.lock().clear();
        tracing::debug!("Cleared {} cache", self.name);
    }
}
