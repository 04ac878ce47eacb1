//! Bounded in-page caches of resolved asset references.
//!
//! Inserts never evict. A periodic [`MemoryCache::trim`] removes the oldest
//! entries once the bound has been exceeded: at least 30% of the entries, and
//! always enough to get back under the bound.

use serde::{Deserialize, Serialize};
use slidecache_core::ResourceKind;
use std::collections::HashMap;

/// Share of entries removed by one trim pass, in percent.
const TRIM_PERCENT: usize = 30;

/// Reference to an asset that has been resolved through the edge tier.
///
/// The bytes stay in the edge stores; the page only remembers what it has
/// already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub url: String,
    pub kind: ResourceKind,
    pub content_type: Option<String>,
    pub size: usize,
}

/// One cached value with the time it was inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCacheEntry<V> {
    pub value: V,
    /// Unix milliseconds.
    pub timestamp: i64,
    #[serde(skip)]
    seq: u64,
}

/// A bounded map whose eviction order is insertion order.
#[derive(Debug)]
pub struct MemoryCache<V> {
    name: &'static str,
    max_entries: usize,
    entries: HashMap<String, ClientCacheEntry<V>>,
    next_seq: u64,
}

impl<V: Clone> MemoryCache<V> {
    pub fn new(name: &'static str, max_entries: usize) -> Self {
        Self { name, max_entries, entries: HashMap::new(), next_seq: 0 }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Look up a value. Lookups do not refresh an entry's position.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let timestamp = chrono::Utc::now().timestamp_millis();
        self.insert_at(key.into(), value, timestamp);
    }

    /// Insert with an explicit timestamp, used when restoring a snapshot.
    pub fn insert_at(&mut self, key: String, value: V, timestamp: i64) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(key, ClientCacheEntry { value, timestamp, seq });
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|e| e.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries oldest first.
    pub fn entries(&self) -> Vec<(&str, &ClientCacheEntry<V>)> {
        let mut all: Vec<_> = self.entries.iter().map(|(k, e)| (k.as_str(), e)).collect();
        all.sort_by_key(|(_, e)| (e.timestamp, e.seq));
        all
    }

    /// Drop the oldest entries if the bound is exceeded.
    ///
    /// Returns the number of removed entries.
    pub fn trim(&mut self) -> usize {
        let len = self.entries.len();
        if len <= self.max_entries {
            return 0;
        }
        let count = (len * TRIM_PERCENT).div_ceil(100).max(len - self.max_entries);
        self.remove_oldest(count)
    }

    /// Drop the oldest 30% regardless of the bound.
    pub fn trim_aggressive(&mut self) -> usize {
        let count = (self.entries.len() * TRIM_PERCENT).div_ceil(100);
        self.remove_oldest(count)
    }

    fn remove_oldest(&mut self, count: usize) -> usize {
        let victims: Vec<String> = self
            .entries()
            .into_iter()
            .take(count)
            .map(|(k, _)| k.to_string())
            .collect();
        for key in &victims {
            self.entries.remove(key);
        }
        if !victims.is_empty() {
            tracing::debug!(cache = self.name, removed = victims.len(), remaining = self.entries.len(), "trimmed");
        }
        victims.len()
    }
}
