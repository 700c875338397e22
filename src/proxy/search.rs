//! Search Form
//!
//! Fluent query builder bound to a master reference. Submitting a form goes
//! straight to the upstream; only the proxy's lookups go through the cache.

use std::sync::Arc;

use crate::upstream::{SearchQuery, SearchResponse, Upstream, UpstreamError, EVERYTHING_FORM};

/// Predicate constructors for the upstream query language.
pub mod predicates {
    /// `[:d = at(path, "value")]`
    pub fn at(path: &str, value: &str) -> String {
        format!("[:d = at({path}, {})]", quote(value))
    }

    /// `[:d = any(path, ["a", "b"])]`
    pub fn any<S: AsRef<str>>(path: &str, values: &[S]) -> String {
        let values: Vec<String> = values.iter().map(|v| quote(v.as_ref())).collect();
        format!("[:d = any({path}, [{}])]", values.join(", "))
    }

    fn quote(value: &str) -> String {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

// == Search Form ==
/// A query under construction.
#[derive(Clone)]
pub struct SearchForm {
    upstream: Arc<dyn Upstream>,
    reference: String,
    query: SearchQuery,
}

impl SearchForm {
    /// Creates a form on `everything` bound to `reference`.
    pub fn new(upstream: Arc<dyn Upstream>, reference: impl Into<String>) -> Self {
        Self {
            upstream,
            reference: reference.into(),
            query: SearchQuery {
                form: EVERYTHING_FORM.to_string(),
                ..Default::default()
            },
        }
    }

    /// Selects the upstream search form.
    pub fn form(mut self, name: impl Into<String>) -> Self {
        self.query.form = name.into();
        self
    }

    /// Adds a predicate. Predicates are combined with AND.
    pub fn query(mut self, predicate: impl Into<String>) -> Self {
        self.query.predicates.push(predicate.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.query.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.query.page_size = Some(page_size);
        self
    }

    pub fn orderings(mut self, orderings: impl Into<String>) -> Self {
        self.query.orderings = Some(orderings.into());
        self
    }

    /// The master reference this form will query.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Rebinds the form to another master reference.
    pub fn at_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }

    // == Fingerprint ==
    /// Deterministic cache key for this query.
    ///
    /// Predicates are sorted since their order doesn't change the result.
    /// The reference is left out: versioning is handled by the cache epoch.
    pub fn fingerprint(&self) -> String {
        let mut predicates: Vec<&str> = self.query.predicates.iter().map(String::as_str).collect();
        predicates.sort_unstable();

        let mut fingerprint = format!("{}:{}", self.query.form, predicates.concat());
        if let Some(page) = self.query.page {
            fingerprint.push_str(&format!("|page={page}"));
        }
        if let Some(page_size) = self.query.page_size {
            fingerprint.push_str(&format!("|pageSize={page_size}"));
        }
        if let Some(orderings) = &self.query.orderings {
            fingerprint.push_str(&format!("|orderings={orderings}"));
        }
        fingerprint
    }

    // == Submit ==
    /// Runs the query upstream. Never cached.
    pub async fn submit(&self) -> Result<SearchResponse, UpstreamError> {
        self.upstream.query(&self.reference, &self.query).await
    }
}

impl std::fmt::Debug for SearchForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchForm")
            .field("reference", &self.reference)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::mock::MockUpstream;

    fn form() -> SearchForm {
        SearchForm::new(Arc::new(MockUpstream::new("ref1")), "ref1")
    }

    #[test]
    fn test_predicates() {
        assert_eq!(
            predicates::at("document.id", "doc-123"),
            "[:d = at(document.id, \"doc-123\")]"
        );
        assert_eq!(
            predicates::any("document.type", &["article", "blog"]),
            "[:d = any(document.type, [\"article\", \"blog\"])]"
        );
    }

    #[test]
    fn test_predicate_values_are_escaped() {
        assert_eq!(
            predicates::at("my.page.title", "say \"hi\""),
            "[:d = at(my.page.title, \"say \\\"hi\\\"\")]"
        );
    }

    #[test]
    fn test_builder_defaults_to_everything() {
        let form = form();
        assert!(form.fingerprint().starts_with(&format!("{EVERYTHING_FORM}:")));
        assert_eq!(form.reference(), "ref1");
    }

    #[tokio::test]
    async fn test_at_reference_rebinds_submit() {
        let upstream = Arc::new(MockUpstream::new("ref1"));
        let form = SearchForm::new(upstream.clone(), "ref1").query(predicates::at("document.id", "x"));
        let fingerprint = form.fingerprint();

        let form = form.at_reference("ref2");
        assert_eq!(form.reference(), "ref2");
        assert_eq!(form.fingerprint(), fingerprint);

        form.submit().await.unwrap();
        assert_eq!(upstream.queries.lock()[0].0, "ref2");
    }

    #[test]
    fn test_fingerprint_ignores_predicate_order() {
        let a = form().query("[:d = at(a, \"1\")]").query("[:d = at(b, \"2\")]");
        let b = form().query("[:d = at(b, \"2\")]").query("[:d = at(a, \"1\")]");

        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_distinguishes_paging_and_form() {
        let base = form().query("[:d = at(a, \"1\")]");

        assert_ne!(base.fingerprint(), base.clone().page(2).fingerprint());
        assert_ne!(base.fingerprint(), base.clone().page_size(50).fingerprint());
        assert_ne!(base.fingerprint(), base.clone().orderings("[my.a.date]").fingerprint());
        assert_ne!(base.fingerprint(), base.clone().form("articles").fingerprint());
    }

    #[tokio::test]
    async fn test_submit_queries_bound_reference() {
        let upstream = Arc::new(MockUpstream::new("ref1"));
        let form = SearchForm::new(upstream.clone(), "ref1")
            .query(predicates::at("document.id", "x"))
            .page_size(5);

        form.submit().await.unwrap();
        form.submit().await.unwrap();

        let queries = upstream.queries.lock();
        assert_eq!(queries.len(), 2, "submit is never cached");
        assert_eq!(queries[0].0, "ref1");
        assert_eq!(queries[0].1.page_size, Some(5));
    }
}
