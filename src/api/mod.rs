//! API Module
//!
//! Admin HTTP surface for inspecting the cache and posting change events.
//!
//! # Endpoints
//! - `GET /cache` - List cached keys
//! - `GET /cache/:key` - Read an entry, applying pending change events
//! - `PUT /cache/:key` - Store an entry
//! - `PATCH /cache/:key` - Shallow-merge fields onto an entry
//! - `DELETE /cache` - Clear all entries and change events
//! - `DELETE /cache/pattern/:pattern` - Clear entries whose key contains a pattern
//! - `POST /events` - Record a change event
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
