//! Proxy Module
//!
//! The public façade: turns document lookups into fingerprints and cached
//! computations, and keeps the cache epoch in step with the upstream master
//! reference through the background refresh task.

mod search;

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::{CacheStats, VersionedCache};
use crate::config::ProxyConfig;
use crate::tasks::{spawn_refresh_task, Refresher};
use crate::upstream::{Document, SearchResponse, Upstream, UpstreamError};

pub use search::{predicates, SearchForm};

/// Cache of query results, keyed by search fingerprint.
pub type ResultCache = VersionedCache<Arc<SearchResponse>, UpstreamError>;

// == Document Lookup ==
/// Outcome of a single-document lookup. Zero matches is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentLookup {
    Found(Document),
    NotFound,
}

impl DocumentLookup {
    pub fn found(self) -> Option<Document> {
        match self {
            DocumentLookup::Found(doc) => Some(doc),
            DocumentLookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, DocumentLookup::Found(_))
    }

    fn first_of(response: &SearchResponse) -> Self {
        response
            .results
            .first()
            .cloned()
            .map_or(DocumentLookup::NotFound, DocumentLookup::Found)
    }
}

// == Proxy ==
/// Caching proxy in front of a versioned content API.
pub struct Proxy {
    cache: Arc<ResultCache>,
    upstream: Arc<dyn Upstream>,
    refresher: Arc<Refresher<Arc<SearchResponse>, UpstreamError>>,
    shutdown: CancellationToken,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
    config: ProxyConfig,
}

impl Proxy {
    // == Constructor ==
    /// Creates a proxy and starts its refresh task.
    ///
    /// The cache epoch starts at the upstream's current master reference.
    /// Must be called from within a tokio runtime.
    pub async fn new(upstream: Arc<dyn Upstream>, config: ProxyConfig) -> Self {
        let master_ref = upstream.master_ref().await;
        let cache = Arc::new(ResultCache::new(config.capacity, config.ttl, master_ref));
        let refresher = Arc::new(Refresher::new(upstream.clone(), cache.clone(), config.debug));

        let shutdown = CancellationToken::new();
        let refresh_task =
            spawn_refresh_task(refresher.clone(), config.master_refresh, shutdown.clone());

        Self {
            cache,
            upstream,
            refresher,
            shutdown,
            refresh_task: Mutex::new(Some(refresh_task)),
            config,
        }
    }

    // == Cached Access ==
    /// Returns the cached result for `fingerprint`, running `compute` on a miss.
    ///
    /// `compute` receives the master reference the result is cached under
    /// and must query at that reference, e.g. by rebinding a form with
    /// [`SearchForm::at_reference`]. Concurrent calls with the same
    /// fingerprint share one computation. Failures are returned to every
    /// waiting caller and never cached.
    pub async fn get<F, Fut>(
        &self,
        fingerprint: &str,
        compute: F,
    ) -> Result<Arc<SearchResponse>, UpstreamError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<SearchResponse, UpstreamError>>,
    {
        self.cache
            .get_or_compute(fingerprint, |reference| async move {
                compute(reference).await.map(Arc::new)
            })
            .await
    }

    /// Fetches a document by id.
    pub async fn get_document(&self, id: &str) -> Result<DocumentLookup, UpstreamError> {
        let form = self.search().query(predicates::at("document.id", id));
        self.first_result(form).await
    }

    /// Fetches a document of type `doc_type` whose `field` equals `value`.
    pub async fn get_document_by(
        &self,
        doc_type: &str,
        field: &str,
        value: impl Display,
    ) -> Result<DocumentLookup, UpstreamError> {
        let form = self
            .search()
            .query(predicates::at(
                &format!("my.{doc_type}.{field}"),
                &value.to_string(),
            ))
            .query(predicates::any("document.type", &[doc_type]));
        self.first_result(form).await
    }

    async fn first_result(&self, form: SearchForm) -> Result<DocumentLookup, UpstreamError> {
        let fingerprint = form.fingerprint();
        let response = self
            .get(&fingerprint, |reference| async move {
                form.at_reference(reference).submit().await
            })
            .await?;
        Ok(DocumentLookup::first_of(&response))
    }

    /// Starts a search bound to the current master reference.
    ///
    /// Submitting the form is not cached; use [`Proxy::get`] with
    /// [`SearchForm::fingerprint`] and [`SearchForm::at_reference`] to route
    /// a search through the cache.
    pub fn search(&self) -> SearchForm {
        SearchForm::new(self.upstream.clone(), self.cache.epoch())
    }

    /// Raw access to the upstream API.
    pub fn direct(&self) -> Arc<dyn Upstream> {
        self.upstream.clone()
    }

    // == Refresh ==
    /// Re-reads the master reference now. Returns true if it changed.
    pub async fn refresh_now(&self) -> Result<bool, UpstreamError> {
        self.refresher.tick().await
    }

    pub fn master_ref(&self) -> String {
        self.cache.epoch()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops every cached entry. Statistics are kept.
    pub fn clear(&self) {
        self.cache.clear();
        debug!("cache cleared");
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    // == Shutdown ==
    /// Stops the refresh task and waits for it to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.refresh_task.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                debug!(error = %err, "refresh task ended abnormally");
            }
        }
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
