//! Configuration Module
//!
//! Handles loading cache and server configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of cache entries before FIFO eviction kicks in
    pub max_entries: usize,
    /// Maximum number of change events kept in the log
    pub max_change_events: usize,
    /// How long a change event stays relevant, in seconds
    pub change_window_secs: u64,
    /// Admin HTTP server port
    pub server_port: u16,
    /// Change-log prune task interval in seconds
    pub prune_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_CACHE_ENTRIES` - Maximum cache entries (default: 100)
    /// - `MAX_CHANGE_EVENTS` - Maximum logged change events (default: 1000)
    /// - `CHANGE_WINDOW_SECS` - Change event relevance window (default: 300)
    /// - `SERVER_PORT` - Admin HTTP server port (default: 3000)
    /// - `PRUNE_INTERVAL` - Change-log prune frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_entries: env_or("MAX_CACHE_ENTRIES", defaults.max_entries),
            max_change_events: env_or("MAX_CHANGE_EVENTS", defaults.max_change_events),
            change_window_secs: env_or("CHANGE_WINDOW_SECS", defaults.change_window_secs),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            prune_interval: env_or("PRUNE_INTERVAL", defaults.prune_interval),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_change_events: 1000,
            change_window_secs: 300,
            server_port: 3000,
            prune_interval: 60,
        }
    }
}
