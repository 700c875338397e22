//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and epoch stamps.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cached value together with its validity metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration instant, None = never expires by time
    pub expires_at: Option<Instant>,
    /// Master reference in effect when the value was computed
    pub epoch: String,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `ttl` - Optional time-to-live; `None`, a zero duration or one too
    ///   large to represent never expires
    /// * `epoch` - The master reference the value belongs to
    /// * `now` - The insertion instant
    pub fn new(value: V, ttl: Option<Duration>, epoch: impl Into<String>, now: Instant) -> Self {
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .and_then(|ttl| now.checked_add(ttl));

        Self {
            value,
            expires_at,
            epoch: epoch.into(),
        }
    }

    // == Is Expired ==
    /// Checks if the entry's time-to-live has elapsed.
    ///
    /// An entry is expired strictly after its expiration instant, so a read at
    /// exactly `expires_at` still counts as fresh.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now > expires,
            None => false,
        }
    }

    // == Is Stale ==
    /// Returns true if the entry must be treated as absent: either its TTL has
    /// elapsed or it was computed under a different master reference.
    pub fn is_stale(&self, current_epoch: &str, now: Instant) -> bool {
        self.is_expired(now) || self.epoch != current_epoch
    }
}
