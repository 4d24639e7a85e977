//! TTL-gated memoization in front of slow or failing remote fetches.
//!
//! Each key carries its own freshness clock, and the TTL is supplied per call,
//! so one cache instance can hold values with different lifetimes (weather
//! `current` at 15 minutes next to `alerts` at 5).
//!
//! A failed fetch never touches the stored entry. Stale data is not served
//! automatically; callers that want a fallback read it with [`RefreshCache::peek`].

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    stored_at: DateTime<Utc>,
    value: V,
}

#[derive(Debug, Clone)]
pub struct RefreshCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V> Default for RefreshCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V: Clone> RefreshCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value for `key`, fetching it if missing or older than `ttl`.
    pub fn get<E, F>(&mut self, key: &str, ttl: Duration, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.get_at(key, ttl, Utc::now(), fetch)
    }

    /// [`RefreshCache::get`] with an explicit clock reading.
    pub fn get_at<E, F>(
        &mut self,
        key: &str,
        ttl: Duration,
        now: DateTime<Utc>,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(entry) = self.entries.get(key) {
            if now - entry.stored_at < ttl {
                debug!(key, "cache hit");
                return Ok(entry.value.clone());
            }
        }

        let value = fetch()?;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                stored_at: now,
                value: value.clone(),
            },
        );
        Ok(value)
    }

    /// Last stored value for `key`, fresh or not.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    /// When `key` was last successfully fetched.
    pub fn stored_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries.get(key).map(|e| e.stored_at)
    }

    pub fn is_fresh(&self, key: &str, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.entries
            .get(key)
            .is_some_and(|e| now - e.stored_at < ttl)
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
