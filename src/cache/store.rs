//! Cache Store Module
//!
//! Bounded key-to-entry map with FIFO eviction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::cache::{CacheEntry, CacheMetadata, CachePayload, FifoTracker};

// == Cache Store ==
/// Entry storage bounded by `max_entries`.
///
/// Eviction removes the first-inserted key. Overwriting a key keeps its
/// original position.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-entry storage
    entries: HashMap<String, CacheEntry>,
    /// Insertion order tracker
    fifo: FifoTracker,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `max_entries` entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            fifo: FifoTracker::new(),
            max_entries,
        }
    }

    // == Commit ==
    /// Stores `data` under `key`, computing its version.
    ///
    /// Evicts oldest-inserted keys until the store is back within bounds and
    /// returns how many were evicted.
    pub fn commit(
        &mut self,
        key: &str,
        data: CachePayload,
        metadata: CacheMetadata,
        applied_through: u64,
        now: DateTime<Utc>,
    ) -> usize {
        let entry = CacheEntry::new(key, data, metadata, applied_through, now);
        if self.entries.insert(key.to_string(), entry).is_none() {
            self.fifo.insert(key);
        }
        self.evict_overflow()
    }

    // == Get ==
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CacheEntry> {
        self.entries.get_mut(key)
    }

    // == Remove Matching ==
    /// Removes every entry whose key contains `pattern`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_matching(&mut self, pattern: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.contains(pattern));
        self.fifo.retain(|key| !key.contains(pattern));
        before - self.entries.len()
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.fifo.clear();
    }

    // == Set Max Entries ==
    /// Changes the bound, evicting immediately if the store is now over it.
    pub fn set_max_entries(&mut self, max_entries: usize) -> usize {
        self.max_entries = max_entries;
        self.evict_overflow()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // == Keys ==
    /// Keys from oldest to newest inserted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fifo.iter()
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.max_entries {
            match self.fifo.evict_oldest() {
                Some(key) => {
                    self.entries.remove(&key);
                    debug!(key = %key, "Evicted oldest cache entry");
                    evicted += 1;
                }
                None => break,
            }
        }
        evicted
    }
}
