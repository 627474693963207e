//! Change-Log Prune Task
//!
//! Background task that periodically drops change events which can no longer
//! be folded into any entry. Entries themselves are never expired by time.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ListingsCache;

/// Spawns a background task that periodically prunes aged-out change events.
///
/// # Arguments
/// * `cache` - Shared listings cache
/// * `prune_interval_secs` - Interval in seconds between prune runs
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_prune_task(cache: Arc<ListingsCache>, prune_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(prune_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting change-log prune task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.prune_change_events();
            if removed > 0 {
                info!("Change-log prune: removed {} expired events", removed);
            } else {
                debug!("Change-log prune: no expired events found");
            }
        }
    })
}
