//! API Handlers
//!
//! HTTP request handlers for each proxy endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{ProxyError, Result};
use crate::models::{
    ClearResponse, HealthResponse, RefreshResponse, SearchRequest, StatsResponse,
};
use crate::proxy::{DocumentLookup, Proxy};
use crate::upstream::{Document, SearchResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The caching proxy
    pub proxy: Arc<Proxy>,
}

impl AppState {
    /// Creates a new AppState around a proxy.
    pub fn new(proxy: Proxy) -> Self {
        Self {
            proxy: Arc::new(proxy),
        }
    }
}

fn found_or_404(lookup: DocumentLookup, what: String) -> Result<Json<Document>> {
    match lookup {
        DocumentLookup::Found(doc) => Ok(Json(doc)),
        DocumentLookup::NotFound => Err(ProxyError::NotFound(what)),
    }
}

/// Handler for GET /documents/:id
///
/// Looks a document up by id through the cache.
pub async fn document_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Document>> {
    let lookup = state.proxy.get_document(&id).await?;
    found_or_404(lookup, id)
}

/// Handler for GET /documents/:type/:field/:value
///
/// Looks a document up by type and field value through the cache.
pub async fn document_by_field_handler(
    State(state): State<AppState>,
    Path((doc_type, field, value)): Path<(String, String, String)>,
) -> Result<Json<Document>> {
    let lookup = state
        .proxy
        .get_document_by(&doc_type, &field, &value)
        .await?;
    found_or_404(lookup, format!("{doc_type} with {field} = {value}"))
}

/// Handler for POST /search
///
/// Runs a search against the current master ref. Not cached.
pub async fn search_handler(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ProxyError::InvalidRequest(error_msg));
    }

    let form = req.apply(state.proxy.search());
    Ok(Json(form.submit().await?))
}

/// Handler for POST /refresh
///
/// Re-reads the upstream master ref immediately.
pub async fn refresh_handler(State(state): State<AppState>) -> Result<Json<RefreshResponse>> {
    let changed = state.proxy.refresh_now().await?;

    Ok(Json(RefreshResponse {
        changed,
        master_ref: state.proxy.master_ref(),
    }))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.proxy.clear();
    Json(ClearResponse::new())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.proxy.stats(),
        state.proxy.config().capacity.limit(),
        state.proxy.master_ref(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::upstream::mock::{document, MockUpstream};
    use crate::upstream::UpstreamError;

    async fn state_with(upstream: MockUpstream) -> (AppState, Arc<MockUpstream>) {
        let upstream = Arc::new(upstream);
        let proxy = Proxy::new(upstream.clone(), ProxyConfig::default()).await;
        (AppState::new(proxy), upstream)
    }

    #[tokio::test]
    async fn test_document_handler_found() {
        let (state, _) =
            state_with(MockUpstream::new("ref1").with_documents(vec![document("doc-1", "page")]))
                .await;

        let response = document_handler(State(state), Path("doc-1".to_string()))
            .await
            .unwrap();
        assert_eq!(response.id, "doc-1");
    }

    #[tokio::test]
    async fn test_document_handler_not_found() {
        let (state, _) = state_with(MockUpstream::new("ref1")).await;

        let result = document_handler(State(state), Path("missing".to_string())).await;
        assert!(matches!(result, Err(ProxyError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_document_handler_upstream_failure() {
        let upstream = MockUpstream::new("ref1");
        *upstream.fail_queries.lock() = Some(UpstreamError::Unavailable("down".into()));
        let (state, _) = state_with(upstream).await;

        let result = document_handler(State(state), Path("doc-1".to_string())).await;
        assert!(matches!(result, Err(ProxyError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_search_handler_invalid_request() {
        let (state, upstream) = state_with(MockUpstream::new("ref1")).await;
        let req: SearchRequest = serde_json::from_str(r#"{"page_size": 0}"#).unwrap();

        let result = search_handler(State(state), Json(req)).await;
        assert!(matches!(result, Err(ProxyError::InvalidRequest(_))));
        assert_eq!(upstream.query_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_handler() {
        let (state, upstream) = state_with(MockUpstream::new("ref1")).await;
        upstream.publish("ref2");

        let response = refresh_handler(State(state.clone())).await.unwrap();
        assert!(response.changed);
        assert_eq!(response.master_ref, "ref2");

        let response = refresh_handler(State(state)).await.unwrap();
        assert!(!response.changed);
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (state, _) = state_with(MockUpstream::new("ref1")).await;

        let response = stats_handler(State(state)).await;
        assert_eq!(response.hits, 0);
        assert_eq!(response.misses, 0);
        assert_eq!(response.capacity, Some(1000));
        assert_eq!(response.master_ref, "ref1");
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
