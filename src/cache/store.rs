//! Entry Store Module
//!
//! Bounded fingerprint -> entry storage combining a HashMap with LRU tracking.
//! Pure data structure: no locking, no I/O, and the caller supplies `now`.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheEntry, LruTracker};

// == Capacity ==
/// Upper bound on the number of stored entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// At most this many entries; the least recently used one is evicted.
    Bounded(NonZeroUsize),
    /// No bound. Memory then grows with the number of distinct fingerprints.
    Unbounded,
}

impl Capacity {
    /// Interprets a configured cache size, where `<= 0` selects `Unbounded`.
    pub fn from_size(size: i64) -> Self {
        usize::try_from(size)
            .ok()
            .and_then(NonZeroUsize::new)
            .map_or(Capacity::Unbounded, Capacity::Bounded)
    }

    /// Returns the bound, or None when unbounded.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Capacity::Bounded(max) => Some(max.get()),
            Capacity::Unbounded => None,
        }
    }
}

// == Entry Store ==
/// Main storage with LRU eviction, TTL and epoch validity checks.
#[derive(Debug)]
pub struct EntryStore<V> {
    /// Fingerprint -> entry storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Maximum number of entries allowed
    capacity: Capacity,
}

impl<V> EntryStore<V> {
    // == Constructor ==
    pub fn new(capacity: Capacity) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            capacity,
        }
    }

    // == Put ==
    /// Inserts or replaces an entry and marks it most recently used.
    ///
    /// If the fingerprint is new and the store is at capacity, the least
    /// recently used entry is evicted first.
    ///
    /// # Arguments
    /// * `fingerprint` - The request fingerprint
    /// * `value` - The computed value
    /// * `ttl` - Time-to-live; `None` or zero never expires
    /// * `epoch` - Master reference the value was computed under
    /// * `now` - Insertion instant
    ///
    /// # Returns
    /// The evicted fingerprint, if any.
    pub fn put(
        &mut self,
        fingerprint: String,
        value: V,
        ttl: Option<Duration>,
        epoch: impl Into<String>,
        now: Instant,
    ) -> Option<String> {
        let mut evicted = None;

        if !self.entries.contains_key(&fingerprint) {
            if let Some(max) = self.capacity.limit() {
                if self.entries.len() >= max {
                    evicted = self.lru.evict_oldest();
                    if let Some(key) = &evicted {
                        self.entries.remove(key);
                    }
                }
            }
        }

        self.lru.touch(&fingerprint);
        self.entries
            .insert(fingerprint, CacheEntry::new(value, ttl, epoch, now));

        evicted
    }

    // == Get ==
    /// Retrieves a fresh entry's value.
    ///
    /// Entries that are expired or belong to another epoch are removed and
    /// reported as absent. Only a fresh read refreshes recency.
    pub fn get(&mut self, fingerprint: &str, epoch: &str, now: Instant) -> Option<&V> {
        let stale = self.entries.get(fingerprint)?.is_stale(epoch, now);
        if stale {
            self.remove(fingerprint);
            return None;
        }

        self.lru.touch(fingerprint);
        self.entries.get(fingerprint).map(|entry| &entry.value)
    }

    // == Remove ==
    /// Removes an entry, returning its value if it was present.
    pub fn remove(&mut self, fingerprint: &str) -> Option<V> {
        let entry = self.entries.remove(fingerprint)?;
        self.lru.remove(fingerprint);
        Some(entry.value)
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
