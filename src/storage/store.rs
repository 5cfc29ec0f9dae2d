use std::collections::HashMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A stored value and the causal token it was written under.
///
/// `value: None` is the tombstone left behind by a delete. Tombstoned
/// entries stay in the map and count toward [`LocalStore::count`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub value: Option<String>,
    pub version: String,
}

impl Entry {
    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }
}

/// The in-memory key-value map owned by this node's shard.
///
/// Unbounded and never evicted; memory growth is an accepted design limit.
#[derive(Default)]
pub struct LocalStore {
    entries: DashMap<String, Entry>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Entry> {
        self.entries.get(key).map(|e| e.clone())
    }

    /// Writes the value under a fresh causal token. Returns whether the key
    /// already had an entry (tombstones included).
    pub fn put(&self, key: &str, value: &str, version: &str) -> bool {
        self.entries
            .insert(
                key.to_string(),
                Entry {
                    value: Some(value.to_string()),
                    version: version.to_string(),
                },
            )
            .is_some()
    }

    /// Overwrites the key with a tombstone. Returns whether the key already
    /// had an entry.
    pub fn delete(&self, key: &str, version: &str) -> bool {
        self.entries
            .insert(
                key.to_string(),
                Entry {
                    value: None,
                    version: version.to_string(),
                },
            )
            .is_some()
    }

    /// Number of keys ever written, tombstones included. Used as a causal
    /// chain-length estimate, not a live-key count.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Full copy of the map, for anti-entropy and reshard transfers.
    pub fn snapshot(&self) -> HashMap<String, Entry> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    /// Replaces the whole map with a peer's snapshot or a reshard subset.
    pub fn replace(&self, entries: HashMap<String, Entry>) {
        self.entries.clear();
        for (key, entry) in entries {
            self.entries.insert(key, entry);
        }
    }
}
