//! Listings Cache Module
//!
//! The cache handed to API handlers: versioned entries, a change-event log,
//! and lazy incremental patching on read.

use std::future::Future;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::clock::{Clock, SystemClock};
use crate::cache::lock::{rw_read, rw_write};
use crate::cache::stats::{CacheSizes, StatsCounters};
use crate::cache::{
    updater, version, CacheEntry, CacheMetadata, CachePayload, CacheStats, CacheStore,
    ChangeEvent, ChangeEventLog, ChangeKind,
};
use crate::config::Config;
use crate::error;

/// Store and log, guarded together so a patch is atomic with respect to
/// concurrent writes and event posts.
#[derive(Debug)]
struct CacheState {
    store: CacheStore,
    log: ChangeEventLog,
}

// == Listings Cache ==
/// In-memory cache for listings and search results.
///
/// Construct one at startup and share it (usually as `Arc<ListingsCache>`)
/// with every handler that reads listings and every write path that posts
/// change events.
///
/// Readers should prefer [`ListingsCache::smart_refresh`], which falls back
/// to the authoritative query whenever the cached value is missing or has
/// pending changes. [`ListingsCache::get`] instead patches pending changes in
/// place and never queries.
pub struct ListingsCache {
    state: RwLock<CacheState>,
    stats: StatsCounters,
    clock: Arc<dyn Clock>,
}

impl ListingsCache {
    // == Constructor ==
    /// Creates a cache sized by `config`, using wall-clock time.
    pub fn from_config(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache sized by `config` that reads time from `clock`.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let window = Duration::seconds(config.change_window_secs as i64);
        Self {
            state: RwLock::new(CacheState {
                store: CacheStore::new(config.max_entries),
                log: ChangeEventLog::new(config.max_change_events, window),
            }),
            stats: StatsCounters::new(),
            clock,
        }
    }

    // == Get ==
    /// Returns the cached payload for `key`, folding in any pending change
    /// events first.
    ///
    /// Never fails: if patching is impossible the last committed payload is
    /// returned unpatched.
    pub fn get(&self, key: &str) -> Option<CachePayload> {
        self.read_with(key, "get", |entry| entry.data.clone())
    }

    /// Same as [`ListingsCache::get`], but returns the whole entry so the
    /// version and metadata match the payload served.
    pub fn get_entry(&self, key: &str) -> Option<CacheEntry> {
        self.read_with(key, "get_entry", CacheEntry::clone)
    }

    fn read_with<T>(
        &self,
        key: &str,
        op: &'static str,
        project: impl Fn(&CacheEntry) -> T,
    ) -> Option<T> {
        let now = self.clock.now();
        {
            let state = rw_read(&self.state, op);
            match state.store.get(key) {
                None => {
                    self.stats.record_miss();
                    debug!(key, "Cache miss");
                    return None;
                }
                Some(entry) => {
                    if !state
                        .log
                        .has_relevant(entry.namespace, entry.applied_through, now)
                    {
                        self.stats.record_hit();
                        return Some(project(entry));
                    }
                }
            }
        }

        // Re-check under the write lock; another reader may have patched already
        let mut state = rw_write(&self.state, op);
        self.patch_locked(&mut state, key, now);
        let found = state.store.get(key).map(project);
        match &found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        found
    }

    /// Folds pending events into the stored entry for `key`. On failure the
    /// entry is left as it was.
    fn patch_locked(&self, state: &mut CacheState, key: &str, now: DateTime<Utc>) {
        let CacheState { store, log } = state;

        let Some(entry) = store.get(key) else {
            return;
        };
        let events = log.relevant_to(entry.namespace, entry.applied_through, now);
        if events.is_empty() {
            return;
        }
        let through = events
            .iter()
            .map(|logged| logged.seq)
            .max()
            .unwrap_or(entry.applied_through);

        match updater::fold(&entry.data, &events) {
            Ok(patched) => {
                if version::has_data_changed(&entry.version, &patched) {
                    let metadata = entry.metadata.clone();
                    let evicted = store.commit(key, patched, metadata, through, now);
                    self.stats.record_evictions(evicted);
                } else if let Some(entry) = store.get_mut(key) {
                    entry.mark_processed(through);
                }
                self.stats.record_incremental_update();
                debug!(key, events = events.len(), through, "Applied change events");
            }
            Err(err) => {
                self.stats.record_patch_failure();
                warn!(
                    key,
                    error = %err,
                    payload = entry.data.kind(),
                    "Incremental update failed, serving last snapshot"
                );
            }
        }
    }

    // == Set ==
    /// Stores `data` under `key`, replacing any previous entry.
    ///
    /// The data is taken to reflect every change event posted so far.
    pub fn set(&self, key: &str, data: CachePayload, metadata: CacheMetadata) {
        let now = self.clock.now();
        let mut state = rw_write(&self.state, "set");
        let through = state.log.head_seq();
        self.commit_locked(&mut state, key, data, metadata, through, now);
    }

    fn commit_locked(
        &self,
        state: &mut CacheState,
        key: &str,
        data: CachePayload,
        metadata: CacheMetadata,
        through: u64,
        now: DateTime<Utc>,
    ) {
        let evicted = state.store.commit(key, data, metadata, through, now);
        self.stats.record_evictions(evicted);
        debug!(key, evicted, "Cache entry stored");
    }

    // == Update Incrementally ==
    /// Shallow-merges the top-level fields of `partial` onto the stored
    /// payload.
    ///
    /// Returns true only if an entry existed and its content changed.
    pub fn update_incrementally(&self, key: &str, partial: &Value) -> bool {
        let now = self.clock.now();
        let mut state = rw_write(&self.state, "update_incrementally");

        let Some(entry) = state.store.get(key) else {
            return false;
        };
        let merged = match entry.data.shallow_merged(partial) {
            Ok(merged) => merged,
            Err(err) => {
                warn!(key, error = %err, "Partial update rejected");
                return false;
            }
        };
        if !version::has_data_changed(&entry.version, &merged) {
            return false;
        }

        let metadata = entry.metadata.clone();
        let through = entry.applied_through;
        self.commit_locked(&mut state, key, merged, metadata, through, now);
        true
    }

    // == Smart Refresh ==
    /// Returns the cached payload if it has no pending changes, otherwise
    /// runs `fetch` and caches its result.
    ///
    /// `fetch` runs without any lock held. Its error is returned as-is and
    /// leaves the cache untouched.
    pub async fn smart_refresh<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        metadata: CacheMetadata,
    ) -> std::result::Result<CachePayload, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<CachePayload, E>>,
    {
        let watermark = {
            let now = self.clock.now();
            let state = rw_read(&self.state, "smart_refresh");
            if let Some(entry) = state.store.get(key) {
                if !state
                    .log
                    .has_relevant(entry.namespace, entry.applied_through, now)
                {
                    self.stats.record_hit();
                    return Ok(entry.data.clone());
                }
            }
            // Events posted while fetching must still apply to the result
            state.log.head_seq()
        };

        self.stats.record_miss();
        debug!(key, "Refreshing cache entry from source");
        let data = fetch().await?;

        let now = self.clock.now();
        let mut state = rw_write(&self.state, "smart_refresh");
        self.commit_locked(&mut state, key, data.clone(), metadata, watermark, now);
        Ok(data)
    }

    // == Add Change Event ==
    /// Records a change made elsewhere. The event's own timestamp is ignored.
    ///
    /// Events lacking the id their kind requires are rejected and logged;
    /// write paths may ignore the result.
    pub fn add_change_event(&self, event: ChangeEvent) -> error::Result<u64> {
        if let Err(err) = event.validate() {
            warn!(kind = ?event.kind, error = %err, "Rejected change event");
            return Err(err);
        }
        let now = self.clock.now();
        let kind = event.kind;
        let seq = rw_write(&self.state, "add_change_event")
            .log
            .add(event, now);
        debug!(?kind, seq, "Change event recorded");
        Ok(seq)
    }

    /// Posts an item change (`item_created`, `item_updated`, `item_deleted`).
    pub fn record_item_change(
        &self,
        kind: ChangeKind,
        item_id: &str,
        data: Option<Value>,
    ) -> error::Result<u64> {
        let mut event = ChangeEvent::item(kind, item_id);
        event.data = data;
        self.add_change_event(event)
    }

    /// Posts a user change (`user_updated`, `verification_changed`).
    pub fn record_user_change(
        &self,
        kind: ChangeKind,
        username: &str,
        data: Option<Value>,
    ) -> error::Result<u64> {
        let mut event = ChangeEvent::user(kind, username);
        event.data = data;
        self.add_change_event(event)
    }

    // == Clear ==
    /// Drops every entry and every change event, returning the number of
    /// entries removed.
    pub fn clear_all(&self) -> usize {
        let mut state = rw_write(&self.state, "clear_all");
        let entries = state.store.len();
        let events = state.log.len();
        state.store.clear();
        state.log.clear();
        info!(entries, events, "Cache cleared");
        entries
    }

    /// Drops every entry whose key contains `pattern`.
    ///
    /// For changes too broad to express as change events.
    pub fn clear_by_pattern(&self, pattern: &str) -> usize {
        let removed = rw_write(&self.state, "clear_by_pattern")
            .store
            .remove_matching(pattern);
        info!(pattern, removed, "Cache entries cleared by pattern");
        removed
    }

    // == Prune ==
    /// Physically drops change events that are past the relevance window.
    pub fn prune_change_events(&self) -> usize {
        let now = self.clock.now();
        rw_write(&self.state, "prune_change_events")
            .log
            .prune_expired(now)
    }

    // == Resize ==
    /// Changes the entry bound, evicting oldest entries if needed.
    pub fn resize(&self, max_entries: usize) -> usize {
        let evicted = rw_write(&self.state, "resize")
            .store
            .set_max_entries(max_entries);
        self.stats.record_evictions(evicted);
        info!(max_entries, evicted, "Cache resized");
        evicted
    }

    // == Inspection ==
    /// Stored entry for `key` as last committed, without applying pending
    /// changes.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        rw_read(&self.state, "peek").store.get(key).cloned()
    }

    /// Keys from oldest to newest inserted.
    pub fn keys(&self) -> Vec<String> {
        rw_read(&self.state, "keys")
            .store
            .keys()
            .map(str::to_string)
            .collect()
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        let state = rw_read(&self.state, "stats");
        self.stats.snapshot(CacheSizes {
            total_entries: state.store.len(),
            max_entries: state.store.max_entries(),
            change_events: state.log.len(),
            max_change_events: state.log.max_events(),
        })
    }
}
