//! Cache Module
//!
//! In-memory caching with TTL expiration, LRU eviction, lazy invalidation by
//! master reference and coalescing of concurrent computations.

mod entry;
mod lru;
mod stats;
mod store;
mod versioned;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use stats::{CacheCounters, CacheStats};
pub use store::{Capacity, EntryStore};
pub use versioned::VersionedCache;
