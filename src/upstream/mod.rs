//! Upstream Module
//!
//! The contract the proxy needs from a versioned content API, the data it
//! exchanges with it, and the errors it can produce.

mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpUpstream;

/// Name of the form that searches the whole repository.
pub const EVERYTHING_FORM: &str = "everything";

// == Upstream Error ==
/// Failure talking to the upstream API.
///
/// Cloneable so a single failed computation can be handed to every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    /// Network, timeout or decoding failure
    #[error("upstream request failed: {0}")]
    Transport(#[source] Arc<reqwest::Error>),

    /// The upstream answered with a non-success status
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The API document lists no master reference
    #[error("upstream API has no master ref")]
    NoMasterRef,

    /// The requested search form does not exist upstream
    #[error("unknown search form: {0}")]
    UnknownForm(String),

    /// Any other upstream-side failure
    #[error("upstream unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Transport(Arc::new(err))
    }
}

// == Data Model ==
/// A single document returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub slugs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Document fragments, kept opaque
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results_per_page: u32,
    /// Number of documents matching the query across all pages
    #[serde(default)]
    pub total_results_size: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub results: Vec<Document>,
}

/// A query against one search form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub form: String,
    /// Predicates, all of which must match
    pub predicates: Vec<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub orderings: Option<String>,
}

impl SearchQuery {
    /// Renders the predicates as the upstream `q` parameter, e.g.
    /// `[[:d = at(document.id, "abc")]]`. Returns None without predicates.
    pub fn q(&self) -> Option<String> {
        if self.predicates.is_empty() {
            None
        } else {
            Some(format!("[{}]", self.predicates.concat()))
        }
    }
}

// == Upstream Trait ==
/// What the proxy consumes from the remote API client.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Returns the master reference as last fetched.
    async fn master_ref(&self) -> String;

    /// Re-fetches the reference state from the network.
    async fn refresh(&self) -> Result<(), UpstreamError>;

    /// Runs a query against `reference`.
    async fn query(
        &self,
        reference: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse, UpstreamError>;
}
