//! Cache Store Module
//!
//! Concurrent key/value store with per-entry TTL, lazy eviction on lookup and
//! batch eviction through `cleanup`.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheEntry, CacheStats};
use crate::config::Config;

/// Map and counters guarded by the instance lock.
#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    stats: CacheStats,
}

// == Expiring Cache ==
/// Thread-safe cache whose entries expire after a time-to-live.
///
/// Every operation except [`size`](Self::size) runs inside a single
/// instance-wide critical section, so operations on one cache are
/// linearizable. The lock is never held across an `.await`.
///
/// The cache never spawns background work. `cleanup_interval` is advisory:
/// drive [`cleanup`](Self::cleanup) from an external timer such as
/// [`spawn_cleanup_task`](crate::tasks::spawn_cleanup_task).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ttl_cache::ExpiringCache;
///
/// let cache = ExpiringCache::new(Duration::from_secs(60), Duration::from_secs(1));
/// cache.put("answer", 42);
/// assert_eq!(cache.get("answer"), Some(42));
/// ```
#[derive(Debug)]
pub struct ExpiringCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    /// Structural entry count, readable without the lock
    len: AtomicUsize,
    default_ttl: Duration,
    cleanup_interval: Duration,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL applied by [`put`](Self::put)
    /// * `cleanup_interval` - Suggested period for external cleanup sweeps
    pub fn new(default_ttl: Duration, cleanup_interval: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::new(),
            }),
            len: AtomicUsize::new(0),
            default_ttl,
            cleanup_interval,
        }
    }

    /// Creates an empty cache from the TTL settings in `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_secs(config.default_ttl),
            Duration::from_secs(config.cleanup_interval),
        )
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        // Every mutation is a single map call, so a panicking holder cannot
        // leave a torn entry behind.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sync_len(&self, inner: &mut Inner<K, V>) {
        let len = inner.entries.len();
        inner.stats.size = len;
        self.len.store(len, Ordering::Release);
    }

    // == Put ==
    /// Inserts or overwrites `key` using the default TTL.
    pub fn put(&self, key: K, value: V) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    /// Inserts or overwrites `key`, expiring `ttl` from now.
    ///
    /// Overwriting replaces both value and expiry. A zero TTL stores an entry
    /// that no subsequent [`get`](Self::get) will return.
    pub fn put_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let mut inner = self.lock();
        let entry = CacheEntry::new(value, Instant::now(), ttl);
        inner.entries.insert(key, entry);
        self.sync_len(&mut inner);
    }

    // == Get ==
    /// Returns the value for `key` if present and unexpired.
    ///
    /// An expired entry found here is removed before returning `None`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let now = Instant::now();

        let expired = match inner.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                let value = entry.value.clone();
                inner.stats.record_hit();
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.remove(key);
            inner.stats.record_expirations(1);
            self.sync_len(inner);
        }
        inner.stats.record_miss();
        None
    }

    /// Returns the remaining lifetime of a live entry.
    ///
    /// Unlike [`get`](Self::get) this neither evicts nor counts a lookup.
    pub fn ttl_remaining<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let inner = self.lock();
        let now = Instant::now();
        inner
            .entries
            .get(key)
            .and_then(|entry| entry.ttl_remaining_at(now))
    }

    // == Remove ==
    /// Deletes any entry for `key`. Absent keys are a no-op.
    pub fn remove<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut inner = self.lock();
        if inner.entries.remove(key).is_some() {
            self.sync_len(&mut inner);
        }
    }

    // == Clear ==
    /// Removes every entry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        self.sync_len(&mut inner);
    }

    // == Size ==
    /// Returns the number of stored entries without taking the lock.
    ///
    /// This is a structural count: entries that have expired but were not
    /// yet touched by [`get`](Self::get) or [`cleanup`](Self::cleanup) are
    /// included. Call `cleanup` first for a live count.
    pub fn size(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    // == Cleanup ==
    /// Removes every entry expired as of the start of the call.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();

        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - inner.entries.len();

        if removed > 0 {
            inner.stats.record_expirations(removed);
            self.sync_len(&mut inner);
        }
        removed
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }

    /// Acquires and releases the lock without touching entries or counters.
    ///
    /// Blocks while another caller holds the lock, which makes it a liveness
    /// check for the cache.
    pub fn ping(&self) {
        drop(self.lock());
    }
}
