//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{CacheMetadata, CachePayload, ChangeEvent, ChangeKind};

/// Request body for storing an entry (PUT /cache/:key)
#[derive(Debug, Clone, Deserialize)]
pub struct SetEntryRequest {
    /// Payload to cache
    pub data: CachePayload,
    #[serde(default)]
    pub metadata: CacheMetadata,
}

/// Request body for posting a change event (POST /events)
///
/// There is no timestamp field: the cache stamps events on arrival.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventRequest {
    /// What changed
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Affected item, for item events
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Affected user, for user events; the author for `item_created`
    #[serde(default)]
    pub username: Option<String>,
    /// Fields to apply
    #[serde(default)]
    pub data: Option<Value>,
}

impl ChangeEventRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.item_id.as_deref() == Some("") {
            return Some("itemId cannot be empty".to_string());
        }
        if self.username.as_deref() == Some("") {
            return Some("username cannot be empty".to_string());
        }
        if let Some(data) = &self.data {
            if !data.is_object() {
                return Some("data must be a JSON object".to_string());
            }
        }
        None
    }

    /// Converts the request into a change event.
    pub fn into_event(self) -> ChangeEvent {
        ChangeEvent {
            kind: self.kind,
            item_id: self.item_id,
            user_id: self.user_id,
            username: self.username,
            timestamp: chrono::Utc::now(),
            data: self.data,
        }
    }
}
