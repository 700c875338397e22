//! HTTP Upstream
//!
//! Client for a Prismic-style content API. The API document at the endpoint
//! lists the available refs (one flagged as master) and the search forms with
//! the URL each one submits to.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::{SearchQuery, SearchResponse, Upstream, UpstreamError};

#[derive(Debug, Clone, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default, rename = "isMasterRef")]
    is_master_ref: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiForm {
    action: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiDocument {
    #[serde(default)]
    refs: Vec<ApiRef>,
    #[serde(default)]
    forms: HashMap<String, ApiForm>,
}

#[derive(Debug)]
struct ApiState {
    master_ref: String,
    forms: HashMap<String, ApiForm>,
}

impl TryFrom<ApiDocument> for ApiState {
    type Error = UpstreamError;

    fn try_from(doc: ApiDocument) -> Result<Self, Self::Error> {
        let master_ref = doc
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(UpstreamError::NoMasterRef)?;

        Ok(Self {
            master_ref,
            forms: doc.forms,
        })
    }
}

// == Http Upstream ==
/// Upstream backed by the remote HTTP API.
#[derive(Debug)]
pub struct HttpUpstream {
    client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    state: RwLock<ApiState>,
}

impl HttpUpstream {
    // == Connect ==
    /// Fetches the API document and builds a client around it.
    ///
    /// # Arguments
    /// * `endpoint` - URL of the API document
    /// * `access_token` - Optional token appended to every request
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    /// Fails if the API document can't be fetched or has no master ref. The
    /// proxy can't start without one, so callers treat this as fatal.
    pub async fn connect(
        endpoint: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let endpoint = endpoint.into();
        let state = fetch_api(&client, &endpoint, access_token.as_deref()).await?;

        debug!(%endpoint, master_ref = %state.master_ref, "connected to upstream API");

        Ok(Self {
            client,
            endpoint,
            access_token,
            state: RwLock::new(state),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

async fn fetch_api(
    client: &reqwest::Client,
    endpoint: &str,
    access_token: Option<&str>,
) -> Result<ApiState, UpstreamError> {
    let mut request = client.get(endpoint);
    if let Some(token) = access_token {
        request = request.query(&[("access_token", token)]);
    }

    let response = check_status(request.send().await?).await?;
    let doc: ApiDocument = response.json().await?;
    doc.try_into()
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn master_ref(&self) -> String {
        self.state.read().await.master_ref.clone()
    }

    async fn refresh(&self) -> Result<(), UpstreamError> {
        let state = fetch_api(&self.client, &self.endpoint, self.access_token.as_deref()).await?;
        *self.state.write().await = state;
        Ok(())
    }

    async fn query(
        &self,
        reference: &str,
        query: &SearchQuery,
    ) -> Result<SearchResponse, UpstreamError> {
        let action = self
            .state
            .read()
            .await
            .forms
            .get(&query.form)
            .map(|form| form.action.clone())
            .ok_or_else(|| UpstreamError::UnknownForm(query.form.clone()))?;

        let mut params: Vec<(&str, String)> = vec![("ref", reference.to_string())];
        if let Some(q) = query.q() {
            params.push(("q", q));
        }
        if let Some(page) = query.page {
            params.push(("page", page.to_string()));
        }
        if let Some(page_size) = query.page_size {
            params.push(("pageSize", page_size.to_string()));
        }
        if let Some(orderings) = &query.orderings {
            params.push(("orderings", orderings.clone()));
        }
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.clone()));
        }

        debug!(form = %query.form, reference, "querying upstream");
        let response = self.client.get(&action).query(&params).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }
}
