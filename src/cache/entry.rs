//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A single stored value together with its absolute expiration instant.
///
/// Instants come from `tokio::time`, so a paused test runtime controls the
/// clock used for every expiry comparison.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Instant the entry was written
    pub inserted_at: Instant,
    /// TTL the entry was written with
    pub ttl: Duration,
    /// Instant after which the entry is considered absent
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry written at `now` that lives for `ttl`.
    ///
    /// A TTL too large to represent saturates to roughly thirty years.
    pub fn new(value: V, now: Instant, ttl: Duration) -> Self {
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(86_400 * 365 * 30));

        Self {
            value,
            inserted_at: now,
            ttl,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is expired as of `now`.
    ///
    /// Boundary condition: the entry is still valid at `now == expires_at` and
    /// expires strictly after. A zero TTL is expired from the moment it is
    /// written.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.ttl.is_zero() || now > self.expires_at
    }

    // == Time To Live ==
    /// Returns the lifetime left as of `now`, or `None` once expired.
    pub fn ttl_remaining_at(&self, now: Instant) -> Option<Duration> {
        if self.is_expired_at(now) {
            return None;
        }
        Some(self.expires_at.saturating_duration_since(now))
    }
}
