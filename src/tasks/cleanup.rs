//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::ExpiringCache;

/// Period used when the caller passes a zero interval.
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// The cache never schedules its own sweeps; this task is the external
/// driver. It sleeps for `interval` between calls to
/// [`ExpiringCache::cleanup`], usually the cache's own
/// [`cleanup_interval`](ExpiringCache::cleanup_interval). A zero interval
/// is replaced by [`MIN_CLEANUP_INTERVAL`].
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(ExpiringCache::new(Duration::from_secs(300), Duration::from_secs(1)));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), cache.cleanup_interval());
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<K, V>(cache: Arc<ExpiringCache<K, V>>, interval: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    let interval = if interval.is_zero() {
        warn!(
            "Zero cleanup interval requested, using {:?} instead",
            MIN_CLEANUP_INTERVAL
        );
        MIN_CLEANUP_INTERVAL
    } else {
        interval
    };

    tokio::spawn(async move {
        info!("Starting TTL cleanup task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
