//! Listings Cache - in-memory cache for listings and search results
//!
//! Entries are versioned by content hash and kept fresh by folding recent
//! change events into them on read, so the authoritative query only runs
//! when there is something it must answer.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::ListingsCache;
pub use config::Config;
pub use tasks::spawn_prune_task;
