//! Response cache for idempotent reads.

use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::body::Method;

/// Cache key: method plus normalized path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: Method,
    pub path: String,
}

impl CacheKey {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: normalize_path(path),
        }
    }
}

/// Trims whitespace and a trailing slash. The root path stays `/`.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim();
    match trimmed.strip_suffix('/') {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => trimmed.to_string(),
    }
}

/// Decoded response bodies keyed by [`CacheKey`].
///
/// Unbounded unless a capacity is given, in which case the least recently
/// used entry is dropped on overflow. The lock is never held across an await.
pub struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, Value>>,
}

impl ResponseCache {
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        let cache = match capacity {
            Some(capacity) => LruCache::new(capacity),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(cache),
        }
    }

    // entries are whole values, so a poisoned lock holds nothing half-written
    fn entries(&self) -> MutexGuard<'_, LruCache<CacheKey, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.entries().get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, value: Value) {
        self.entries().put(key, value);
    }

    /// Removes one entry. Returns whether it was present.
    pub fn evict(&self, key: &CacheKey) -> bool {
        self.entries().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(None)
    }
}
