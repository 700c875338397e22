//! Versioned Cache Module
//!
//! Wraps an [`EntryStore`] with the current master reference ("epoch"),
//! hit/miss accounting and per-fingerprint request coalescing.
//!
//! Entries, the epoch and the in-flight table share one lock so that a reader
//! always compares an entry against the epoch visible at the same instant. The
//! lock is never held across an `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::trace;

use crate::cache::{Capacity, CacheCounters, CacheStats, EntryStore};

/// Published outcome of a computation, `None` until the leader finishes.
type Outcome<V, E> = Option<Result<V, E>>;

struct CacheState<V, E> {
    store: EntryStore<V>,
    epoch: String,
    inflight: HashMap<String, watch::Receiver<Outcome<V, E>>>,
}

// == Versioned Cache ==
/// Bounded, TTL- and epoch-aware cache with singleflight computation.
pub struct VersionedCache<V, E> {
    state: Mutex<CacheState<V, E>>,
    counters: CacheCounters,
    ttl: Option<Duration>,
}

enum Lookup<'a, V, E> {
    Hit(V),
    Join(watch::Receiver<Outcome<V, E>>),
    Lead(Flight<'a, V, E>),
}

impl<V, E> VersionedCache<V, E>
where
    V: Clone,
    E: Clone,
{
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `capacity` - Entry bound, see [`Capacity`]
    /// * `ttl` - Default time-to-live of new entries; `None` or zero never expires
    /// * `epoch` - Initial master reference
    pub fn new(capacity: Capacity, ttl: Option<Duration>, epoch: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(CacheState {
                store: EntryStore::new(capacity),
                epoch: epoch.into(),
                inflight: HashMap::new(),
            }),
            counters: CacheCounters::new(),
            ttl,
        }
    }

    // == Get Or Compute ==
    /// Returns the cached value for `fingerprint`, computing it on a miss.
    ///
    /// Concurrent callers for the same fingerprint share a single invocation
    /// of `compute` and all receive its result. `compute` is handed the epoch
    /// the value will be stored under and must compute against it. The value
    /// is only stored if that epoch is still current when it completes;
    /// errors are handed to every waiter but never stored.
    pub async fn get_or_compute<F, Fut>(&self, fingerprint: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let mut miss_recorded = false;

        let flight = loop {
            let mut receiver = match self.lookup(fingerprint, &mut miss_recorded) {
                Lookup::Hit(value) => return Ok(value),
                Lookup::Lead(flight) => break flight,
                Lookup::Join(receiver) => receiver,
            };

            trace!(fingerprint, "waiting on in-flight computation");
            let published = receiver
                .wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|outcome| (*outcome).clone());
            if let Some(result) = published {
                return result;
            }
            // The leader was dropped before publishing; look again.
        };

        let result = compute(flight.epoch.clone()).await;
        flight.complete(result.clone());
        result
    }

    fn lookup(&self, fingerprint: &str, miss_recorded: &mut bool) -> Lookup<'_, V, E> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let Some(value) = state.store.get(fingerprint, &state.epoch, Instant::now()) {
            self.counters.record_hit();
            return Lookup::Hit(value.clone());
        }
        self.counters.set_total_entries(state.store.len());

        if !*miss_recorded {
            self.counters.record_miss();
            *miss_recorded = true;
        }

        if let Some(receiver) = state.inflight.get(fingerprint) {
            return Lookup::Join(receiver.clone());
        }

        let (sender, receiver) = watch::channel(None);
        state.inflight.insert(fingerprint.to_string(), receiver);
        Lookup::Lead(Flight {
            cache: self,
            fingerprint: fingerprint.to_string(),
            epoch: state.epoch.clone(),
            sender,
            finished: false,
        })
    }

    // == Set Epoch ==
    /// Advances the master reference.
    ///
    /// Returns true if it changed. Stored entries are not touched: those
    /// computed under the previous epoch fail the validity check on next read.
    pub fn set_epoch(&self, epoch: impl Into<String>) -> bool {
        let epoch = epoch.into();
        let mut state = self.state.lock();
        if state.epoch == epoch {
            return false;
        }
        state.epoch = epoch;
        true
    }

    /// Returns the current master reference.
    pub fn epoch(&self) -> String {
        self.state.lock().epoch.clone()
    }

    /// Removes a single entry. Returns true if it was present.
    pub fn remove(&self, fingerprint: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.store.remove(fingerprint).is_some();
        self.counters.set_total_entries(state.store.len());
        removed
    }

    // == Clear ==
    /// Drops every stored entry.
    ///
    /// Statistics are cumulative and survive a clear; computations already in
    /// flight still publish (and store) their results.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.store.clear();
        self.counters.set_total_entries(0);
    }

    /// Returns a snapshot of the counters without taking the entry lock.
    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Flight ==
/// Leadership of one in-progress computation.
///
/// Dropping it without calling [`Flight::complete`] (e.g. when the leading
/// request is cancelled) unregisters the flight so that waiters can retry.
struct Flight<'a, V, E> {
    cache: &'a VersionedCache<V, E>,
    fingerprint: String,
    epoch: String,
    sender: watch::Sender<Outcome<V, E>>,
    finished: bool,
}

impl<V, E> Flight<'_, V, E> {
    fn complete(mut self, result: Result<V, E>)
    where
        V: Clone,
    {
        {
            let mut state = self.cache.state.lock();
            // A result for a superseded epoch is stale on arrival, and storing
            // it could evict a live entry
            let current = self.epoch == state.epoch;
            if let Some(value) = result.as_ref().ok().filter(|_| current) {
                let evicted = state.store.put(
                    self.fingerprint.clone(),
                    value.clone(),
                    self.cache.ttl,
                    self.epoch.as_str(),
                    Instant::now(),
                );
                if evicted.is_some() {
                    self.cache.counters.record_eviction();
                }
                self.cache.counters.set_total_entries(state.store.len());
            }
            state.inflight.remove(&self.fingerprint);
        }

        // Receivers keep the value, so waiters that have not polled yet still see it
        self.sender.send_replace(Some(result));
        self.finished = true;
    }
}

impl<V, E> Drop for Flight<'_, V, E> {
    fn drop(&mut self) {
        if !self.finished {
            self.cache.state.lock().inflight.remove(&self.fingerprint);
        }
    }
}
