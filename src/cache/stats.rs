//! Cache Statistics Module
//!
//! Diagnostic counters for hits, misses, incremental updates and evictions.
//! Nothing in the cache reads these back to make decisions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Stats Counters ==
/// Live counters, updated without holding the cache lock.
#[derive(Debug, Default)]
pub struct StatsCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    incremental_updates: AtomicU64,
    patch_failures: AtomicU64,
    evictions: AtomicU64,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    // == Record Hit ==
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Miss ==
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Incremental Update ==
    /// Counts one entry patched from change events.
    pub fn record_incremental_update(&self) {
        self.incremental_updates.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Patch Failure ==
    pub fn record_patch_failure(&self) {
        self.patch_failures.fetch_add(1, Ordering::Relaxed);
    }

    // == Record Evictions ==
    pub fn record_evictions(&self, count: usize) {
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the counters into a `CacheStats`, filling in the sizes.
    pub fn snapshot(&self, sizes: CacheSizes) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            incremental_updates: self.incremental_updates.load(Ordering::Relaxed),
            patch_failures: self.patch_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            total_entries: sizes.total_entries,
            max_entries: sizes.max_entries,
            change_events: sizes.change_events,
            max_change_events: sizes.max_change_events,
        }
    }
}

// == Cache Sizes ==
/// Current occupancy and bounds, read under the cache lock.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheSizes {
    pub total_entries: usize,
    pub max_entries: usize,
    pub change_events: usize,
    pub max_change_events: usize,
}

// == Cache Stats ==
/// Point-in-time view of cache statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads served from the cache
    pub hits: u64,
    /// Reads that found no entry
    pub misses: u64,
    /// Entries patched from change events
    pub incremental_updates: u64,
    /// Patches discarded because the payload or event was malformed
    pub patch_failures: u64,
    /// Entries evicted to stay within `max_entries`
    pub evictions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    pub max_entries: usize,
    /// Change events currently held in the log
    pub change_events: usize,
    pub max_change_events: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
