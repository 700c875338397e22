//! Master Ref Refresh Task
//!
//! Background task that periodically re-reads the upstream master reference
//! and advances the cache epoch when it changes.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::VersionedCache;
use crate::config::{DEFAULT_MASTER_REFRESH, MAX_DURATION};
use crate::upstream::{Upstream, UpstreamError};

// == Refresher ==
/// One refresh step: ask upstream for its reference and hand it to the cache.
pub struct Refresher<V, E> {
    upstream: Arc<dyn Upstream>,
    cache: Arc<VersionedCache<V, E>>,
    /// Log reference changes and failed ticks
    debug: bool,
}

impl<V, E> Refresher<V, E>
where
    V: Clone,
    E: Clone,
{
    pub fn new(upstream: Arc<dyn Upstream>, cache: Arc<VersionedCache<V, E>>, debug: bool) -> Self {
        Self {
            upstream,
            cache,
            debug,
        }
    }

    // == Tick ==
    /// Refreshes the upstream reference state and updates the cache epoch.
    ///
    /// Returns true if the master reference changed.
    pub async fn tick(&self) -> Result<bool, UpstreamError> {
        self.upstream.refresh().await?;
        let master_ref = self.upstream.master_ref().await;

        let changed = self.cache.set_epoch(master_ref.as_str());
        if changed && self.debug {
            info!(%master_ref, "master ref changed, cached entries are now stale");
        }
        Ok(changed)
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

/// Spawns the refresh loop.
///
/// Ticks every `interval` (a zero interval falls back to the one minute
/// default, and longer ones are capped at [`MAX_DURATION`]). Failed ticks are skipped and retried on the next one. The loop
/// ends only when `shutdown` is cancelled, including in the middle of a tick.
///
/// # Example
/// ```ignore
/// let shutdown = CancellationToken::new();
/// let handle = spawn_refresh_task(refresher, Duration::from_secs(60), shutdown.clone());
/// // Later, during shutdown:
/// shutdown.cancel();
/// handle.await?;
/// ```
pub fn spawn_refresh_task<V, E>(
    refresher: Arc<Refresher<V, E>>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let interval = if interval.is_zero() {
        DEFAULT_MASTER_REFRESH
    } else {
        interval.min(MAX_DURATION)
    };

    tokio::spawn(async move {
        debug!(interval_secs = interval.as_secs_f64(), "starting master ref refresh task");

        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                _ = shutdown.cancelled() => break,
                outcome = refresher.tick() => outcome,
            };

            match outcome {
                Ok(true) => {}
                Ok(false) => debug!("master ref unchanged"),
                Err(err) if refresher.debug() => {
                    warn!(error = %err, "master ref refresh failed, retrying next tick");
                }
                Err(_) => {}
            }
        }

        debug!("master ref refresh task stopped");
    })
}
