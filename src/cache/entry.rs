//! Cache Entry Module
//!
//! Defines stored entries, their caller-owned metadata and the namespace an
//! entry belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::cache::payload::CachePayload;
use crate::cache::version::{self, Version};

// == Namespace ==
/// Key namespace, deciding which change events can affect an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Newest / popular listings
    Listings,
    /// Search result pages
    Search,
    /// Anything else; not wired into change events
    Other,
}

impl Namespace {
    /// Derives the namespace of a key such as `listings:items:v2:0:16`.
    ///
    /// Segments are checked first; keys that do not follow the segment
    /// convention fall back to substring matching.
    pub fn from_key(key: &str) -> Self {
        for segment in key.split(':') {
            match segment {
                "listings" | "scripts" => return Namespace::Listings,
                "search" => return Namespace::Search,
                _ => {}
            }
        }

        if key.contains("scripts") {
            Namespace::Listings
        } else if key.contains("search") {
            Namespace::Search
        } else {
            Namespace::Other
        }
    }
}

// == Cache Metadata ==
/// Caller-owned metadata, preserved verbatim across reads and patches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Advisory only. The cache never expires entries by time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CacheMetadata {
    pub fn with_total_count(mut self, total_count: u64) -> Self {
        self.total_count = Some(total_count);
        self
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Attaches a free-form field such as `query` or `isFallback`.
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }
}

// == Cache Entry ==
/// A single cached value with its version and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached payload
    pub data: CachePayload,
    /// Fingerprint of `data` as of the last commit
    pub version: Version,
    /// When this entry was last committed
    pub last_updated: DateTime<Utc>,
    /// Caller-owned metadata
    pub metadata: CacheMetadata,
    /// Namespace derived from the key at commit time
    pub namespace: Namespace,
    /// Highest change-event sequence number reflected in `data`
    pub applied_through: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry, computing its version from `data`.
    pub fn new(
        key: &str,
        data: CachePayload,
        metadata: CacheMetadata,
        applied_through: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let version = version::hash(&data);
        Self {
            data,
            version,
            last_updated: now,
            metadata,
            namespace: Namespace::from_key(key),
            applied_through,
        }
    }

    // == Mark Processed ==
    /// Records that events up to `seq` are reflected in this entry.
    ///
    /// The watermark never moves backwards.
    pub fn mark_processed(&mut self, seq: u64) {
        self.applied_through = self.applied_through.max(seq);
    }
}
