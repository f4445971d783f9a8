use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// A successful response and when it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fetched_at: DateTime<Utc>,
    pub payload: Value,
}

impl CacheEntry {
    pub fn is_fresh_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now - self.fetched_at < max_age
    }
}

/// Successful responses keyed by the exact endpoint string, query included.
///
/// There is no size bound and nothing is evicted; stale entries are simply
/// never served and get overwritten by the next successful fetch.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: HashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the payload for `endpoint` if it was fetched less than
    /// `max_age` before `now`.
    pub fn get_fresh(&self, endpoint: &str, now: DateTime<Utc>, max_age: Duration) -> Option<&Value> {
        self.entries
            .get(endpoint)
            .filter(|entry| entry.is_fresh_at(now, max_age))
            .map(|entry| &entry.payload)
    }

    pub fn insert(&mut self, endpoint: impl Into<String>, payload: Value, fetched_at: DateTime<Utc>) {
        self.entries
            .insert(endpoint.into(), CacheEntry { fetched_at, payload });
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
