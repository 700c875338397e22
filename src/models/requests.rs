//! Request DTOs for the proxy server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::proxy::SearchForm;
use crate::upstream::EVERYTHING_FORM;

/// Largest page size accepted by the search endpoint
pub const MAX_PAGE_SIZE: u32 = 100;

fn default_form() -> String {
    EVERYTHING_FORM.to_string()
}

/// Request body for an uncached search (POST /search)
///
/// # Fields
/// - `form`: Upstream search form (default: `everything`)
/// - `q`: Predicates, all of which must match
/// - `page`, `page_size`, `orderings`: Passed through to the upstream
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    #[serde(default = "default_form")]
    pub form: String,
    #[serde(default)]
    pub q: Vec<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub orderings: Option<String>,
}

impl SearchRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.form.trim().is_empty() {
            return Some("Form cannot be empty".to_string());
        }
        if self.q.iter().any(|predicate| predicate.trim().is_empty()) {
            return Some("Predicates cannot be empty".to_string());
        }
        if self.page == Some(0) {
            return Some("Page numbers start at 1".to_string());
        }
        match self.page_size {
            Some(0) => Some("Page size must be positive".to_string()),
            Some(size) if size > MAX_PAGE_SIZE => Some(format!(
                "Page size exceeds maximum of {}",
                MAX_PAGE_SIZE
            )),
            _ => None,
        }
    }

    /// Applies the request to a search form.
    pub fn apply(self, form: SearchForm) -> SearchForm {
        let mut form = form.form(self.form);
        for predicate in self.q {
            form = form.query(predicate);
        }
        if let Some(page) = self.page {
            form = form.page(page);
        }
        if let Some(page_size) = self.page_size {
            form = form.page_size(page_size);
        }
        if let Some(orderings) = self.orderings {
            form = form.orderings(orderings);
        }
        form
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> SearchRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_search_request_defaults() {
        let req = request("{}");
        assert_eq!(req.form, "everything");
        assert!(req.q.is_empty());
        assert!(req.page.is_none());
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_search_request_full() {
        let req = request(
            r#"{"form": "articles", "q": ["[:d = any(document.type, [\"article\"])]"], "page": 2, "page_size": 10, "orderings": "[my.article.date desc]"}"#,
        );
        assert_eq!(req.form, "articles");
        assert_eq!(req.q.len(), 1);
        assert_eq!(req.page_size, Some(10));
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_validate_rejects_bad_paging() {
        assert!(request(r#"{"page": 0}"#).validate().is_some());
        assert!(request(r#"{"page_size": 0}"#).validate().is_some());
        assert!(request(r#"{"page_size": 1000}"#).validate().is_some());
    }

    #[test]
    fn test_validate_rejects_empty_predicate() {
        assert!(request(r#"{"q": ["  "]}"#).validate().is_some());
        assert!(request(r#"{"form": ""}"#).validate().is_some());
    }
}
