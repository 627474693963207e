//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheEntry, CacheMetadata, CachePayload, CacheStats, ChangeKind, Namespace};

/// Response body for reading an entry (GET /cache/:key)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub key: String,
    /// Payload after pending change events were applied
    pub data: CachePayload,
    pub version: String,
    pub namespace: Namespace,
    pub last_updated: DateTime<Utc>,
    pub metadata: CacheMetadata,
}

impl EntryResponse {
    /// Builds the response from the stored entry; `data` is taken from the
    /// entry so version and payload always agree.
    pub fn new(key: impl Into<String>, entry: CacheEntry) -> Self {
        Self {
            key: key.into(),
            data: entry.data,
            version: entry.version.to_string(),
            namespace: entry.namespace,
            last_updated: entry.last_updated,
            metadata: entry.metadata,
        }
    }
}

/// Response body for storing or patching an entry (PUT/PATCH /cache/:key)
#[derive(Debug, Clone, Serialize)]
pub struct WriteResponse {
    /// Success message
    pub message: String,
    pub key: String,
    /// False when a patch left the entry unchanged
    pub updated: bool,
}

impl WriteResponse {
    pub fn stored(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' stored", key),
            key,
            updated: true,
        }
    }

    pub fn patched(key: impl Into<String>, updated: bool) -> Self {
        let key = key.into();
        let message = if updated {
            format!("Key '{}' updated", key)
        } else {
            format!("Key '{}' unchanged", key)
        };
        Self {
            message,
            key,
            updated,
        }
    }
}

/// Response body for listing keys (GET /cache)
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    /// Keys from oldest to newest inserted
    pub keys: Vec<String>,
    pub count: usize,
}

impl KeysResponse {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for clear operations (DELETE /cache, DELETE /cache/pattern/:pattern)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Number of entries removed
    pub removed: usize,
}

impl ClearResponse {
    pub fn all(removed: usize) -> Self {
        Self {
            message: format!("Cleared {} entries and all change events", removed),
            removed,
        }
    }

    pub fn pattern(pattern: &str, removed: usize) -> Self {
        Self {
            message: format!("Cleared {} entries matching '{}'", removed, pattern),
            removed,
        }
    }
}

/// Response body for posting a change event (POST /events)
#[derive(Debug, Clone, Serialize)]
pub struct EventResponse {
    /// Success message
    pub message: String,
    /// Sequence number assigned by the change log
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
}

impl EventResponse {
    pub fn new(seq: u64, kind: ChangeKind) -> Self {
        Self {
            message: format!("Change event {} recorded", seq),
            seq,
            kind,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
