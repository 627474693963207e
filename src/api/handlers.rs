//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::ListingsCache;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    ChangeEventRequest, ClearResponse, EntryResponse, EventResponse, HealthResponse,
    KeysResponse, SetEntryRequest, StatsResponse, WriteResponse,
};

/// Application state shared across all handlers.
///
/// The cache synchronizes internally, so handlers share it through a plain
/// `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ListingsCache>,
}

impl AppState {
    /// Creates a new AppState around an existing cache.
    pub fn new(cache: Arc<ListingsCache>) -> Self {
        Self { cache }
    }

    /// Creates a new AppState with a cache sized from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(ListingsCache::from_config(config)))
    }
}

/// Handler for GET /cache
///
/// Lists cached keys, oldest first.
pub async fn list_keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.cache.keys()))
}

/// Handler for GET /cache/:key
///
/// Returns the entry after folding in pending change events.
pub async fn get_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>> {
    match state.cache.get_entry(&key) {
        Some(entry) => Ok(Json(EntryResponse::new(key, entry))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for PUT /cache/:key
pub async fn set_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetEntryRequest>,
) -> Result<Json<WriteResponse>> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }

    state.cache.set(&key, req.data, req.metadata);
    Ok(Json(WriteResponse::stored(key)))
}

/// Handler for PATCH /cache/:key
///
/// Shallow-merges the body onto the stored payload.
pub async fn patch_entry_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(partial): Json<Value>,
) -> Result<Json<WriteResponse>> {
    if !partial.is_object() {
        return Err(CacheError::InvalidRequest(
            "Patch body must be a JSON object".to_string(),
        ));
    }
    if state.cache.peek(&key).is_none() {
        return Err(CacheError::NotFound(key));
    }

    let updated = state.cache.update_incrementally(&key, &partial);
    Ok(Json(WriteResponse::patched(key, updated)))
}

/// Handler for POST /events
///
/// Records a change event; matching entries are patched on their next read.
pub async fn post_event_handler(
    State(state): State<AppState>,
    Json(req): Json<ChangeEventRequest>,
) -> Result<Json<EventResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let event = req.into_event();
    let kind = event.kind;
    let seq = state.cache.add_change_event(event)?;

    Ok(Json(EventResponse::new(seq, kind)))
}

/// Handler for DELETE /cache
///
/// Drops every entry and every pending change event.
pub async fn clear_all_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse::all(state.cache.clear_all()))
}

/// Handler for DELETE /cache/pattern/:pattern
pub async fn clear_pattern_handler(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Result<Json<ClearResponse>> {
    // An empty pattern would match every key
    if pattern.is_empty() {
        return Err(CacheError::InvalidRequest(
            "Pattern cannot be empty".to_string(),
        ));
    }

    let removed = state.cache.clear_by_pattern(&pattern);
    Ok(Json(ClearResponse::pattern(&pattern, removed)))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
