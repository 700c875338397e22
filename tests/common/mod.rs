//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use ref_proxy::cache::Capacity;
use ref_proxy::upstream::{Document, SearchQuery, SearchResponse, Upstream, UpstreamError};
use ref_proxy::ProxyConfig;

/// In-memory upstream serving a fixed set of documents.
pub struct StaticUpstream {
    remote_ref: Mutex<String>,
    local_ref: Mutex<String>,
    documents: Mutex<Vec<Document>>,
    pub failure: Mutex<Option<UpstreamError>>,
    pub queries: AtomicUsize,
    /// Artificial latency of each query
    pub latency: Mutex<Duration>,
}

impl StaticUpstream {
    pub fn new(reference: &str, documents: Vec<Document>) -> Self {
        Self {
            remote_ref: Mutex::new(reference.to_string()),
            local_ref: Mutex::new(reference.to_string()),
            documents: Mutex::new(documents),
            failure: Mutex::new(None),
            queries: AtomicUsize::new(0),
            latency: Mutex::new(Duration::ZERO),
        }
    }

    /// Makes `reference` the master ref seen after the next refresh.
    pub fn publish(&self, reference: &str, documents: Vec<Document>) {
        *self.remote_ref.lock() = reference.to_string();
        *self.documents.lock() = documents;
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Upstream for StaticUpstream {
    async fn master_ref(&self) -> String {
        self.local_ref.lock().clone()
    }

    async fn refresh(&self) -> Result<(), UpstreamError> {
        *self.local_ref.lock() = self.remote_ref.lock().clone();
        Ok(())
    }

    async fn query(
        &self,
        _reference: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse, UpstreamError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }

        let results: Vec<Document> = self
            .documents
            .lock()
            .iter()
            .filter(|doc| {
                query.predicates.iter().all(|predicate| {
                    predicate.contains(&format!("\"{}\"", doc.id))
                        || predicate.contains(&format!("\"{}\"", doc.doc_type))
                })
            })
            .cloned()
            .collect();

        Ok(SearchResponse {
            page: 1,
            results_per_page: 20,
            total_results_size: results.len() as u64,
            total_pages: 1,
            results,
        })
    }
}

pub fn document(id: &str, doc_type: &str, title: &str) -> Document {
    Document {
        id: id.to_string(),
        uid: None,
        doc_type: doc_type.to_string(),
        href: format!("https://repo.example.com/api/documents/{id}"),
        tags: Vec::new(),
        slugs: Vec::new(),
        lang: Some("en-us".to_string()),
        data: serde_json::json!({ "title": title }),
    }
}

pub fn test_config() -> ProxyConfig {
    ProxyConfig {
        capacity: Capacity::from_size(100),
        ttl: Some(Duration::from_secs(3600)),
        master_refresh: Duration::from_secs(3600),
        debug: false,
    }
}
