//! Ref Proxy - A caching proxy for versioned content APIs
//!
//! Caches query results per master ref with TTL expiration and LRU eviction,
//! coalesces concurrent lookups, and invalidates lazily when the upstream
//! master ref moves.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use config::{Config, ProxyConfig};
pub use proxy::{DocumentLookup, Proxy};
pub use upstream::{HttpUpstream, Upstream};
