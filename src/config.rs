//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::time::Duration;

use tracing::warn;

use crate::cache::Capacity;
use crate::error::{ProxyError, Result};

/// Refresh period used when none (or zero) is configured.
pub const DEFAULT_MASTER_REFRESH: Duration = Duration::from_secs(60);

/// Longest accepted TTL, refresh interval or timeout (ten years).
pub const MAX_DURATION: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

// == Proxy Config ==
/// Settings the proxy core consumes.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Maximum number of cached query results
    pub capacity: Capacity,
    /// Default entry TTL, None = entries only go stale when the master ref moves
    pub ttl: Option<Duration>,
    /// Period of the master ref refresh task
    pub master_refresh: Duration,
    /// Log master ref changes and refresh failures
    pub debug: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            capacity: Capacity::from_size(1000),
            ttl: None,
            master_refresh: DEFAULT_MASTER_REFRESH,
            debug: false,
        }
    }
}

/// Server configuration parameters.
///
/// All values except the upstream URL have sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the upstream API document
    pub upstream_url: String,
    /// Access token sent with every upstream request
    pub access_token: Option<String>,
    /// Maximum cached entries, `<= 0` disables the bound
    pub cache_size: i64,
    /// Default TTL in seconds, 0 = never expires by time
    pub cache_ttl: u64,
    /// Master ref refresh period in seconds, 0 = default
    pub master_refresh_interval: u64,
    /// Upstream request timeout in seconds
    pub upstream_timeout: u64,
    /// HTTP server port
    pub server_port: u16,
    pub debug: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `UPSTREAM_URL` - API document URL (required)
    /// - `UPSTREAM_ACCESS_TOKEN` - Access token (optional)
    /// - `CACHE_SIZE` - Maximum cache entries (default: 1000, `<= 0` = unbounded)
    /// - `CACHE_TTL` - Default TTL in seconds (default: 0 = never expires)
    /// - `MASTER_REFRESH_INTERVAL` - Refresh period in seconds (default: 60)
    /// - `UPSTREAM_TIMEOUT` - Request timeout in seconds (default: 10)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `DEBUG` - `true`/`1` to log master ref changes (default: false)
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let upstream_url = lookup("UPSTREAM_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ProxyError::Config("UPSTREAM_URL must be set".to_string()))?;

        Ok(Self {
            upstream_url,
            access_token: lookup("UPSTREAM_ACCESS_TOKEN").filter(|token| !token.is_empty()),
            cache_size: parse_or(&lookup, "CACHE_SIZE", 1000),
            cache_ttl: parse_secs(&lookup, "CACHE_TTL", 0)?,
            master_refresh_interval: parse_secs(&lookup, "MASTER_REFRESH_INTERVAL", 60)?,
            upstream_timeout: parse_secs(&lookup, "UPSTREAM_TIMEOUT", 10)?,
            server_port: parse_or(&lookup, "SERVER_PORT", 3000),
            debug: lookup("DEBUG")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }

    /// Derives the settings of the proxy core.
    pub fn proxy_config(&self) -> ProxyConfig {
        let capacity = Capacity::from_size(self.cache_size);
        if capacity == Capacity::Unbounded {
            warn!(
                cache_size = self.cache_size,
                "cache size is not positive, the cache is unbounded"
            );
        }

        let master_refresh = match self.master_refresh_interval {
            0 => DEFAULT_MASTER_REFRESH,
            secs => Duration::from_secs(secs),
        };

        ProxyConfig {
            capacity,
            ttl: (self.cache_ttl > 0).then(|| Duration::from_secs(self.cache_ttl)),
            master_refresh,
            debug: self.debug,
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> T {
    lookup(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parses a duration in seconds, rejecting values above [`MAX_DURATION`].
fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<u64> {
    let secs = parse_or(lookup, name, default);
    if secs > MAX_DURATION.as_secs() {
        return Err(ProxyError::Config(format!(
            "{name} must be at most {} seconds",
            MAX_DURATION.as_secs()
        )));
    }
    Ok(secs)
}
