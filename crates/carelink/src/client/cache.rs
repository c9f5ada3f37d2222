use std::time::Duration;

use moka::sync::Cache;
use serde_json::Value;

const MAX_ENTRIES: u64 = 512;

/// Decoded GET responses keyed by request path, served until their stale time lapses.
#[derive(Clone)]
pub struct QueryCache {
    entries: Cache<String, Value>,
}

impl QueryCache {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(MAX_ENTRIES)
                .time_to_live(stale_time)
                .build(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key)
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    /// Drops every entry whose key starts with `prefix`; returns how many were dropped.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let stale: Vec<_> = self
            .entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key)
            .collect();
        for key in &stale {
            self.entries.invalidate(key.as_str());
        }
        stale.len()
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}
