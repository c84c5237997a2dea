//! Extraction response: the shape returned by a source adapter's `extract`
//! call, plus the secondary-request contract it carries.

use crate::value::AttrMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A secondary URL the extractor asks the fetcher to retrieve before a
/// second extraction attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnresolvedAjaxRequest {
    pub url: String,
    pub method: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    pub cookie: Option<String>,
    pub timeout: Option<u32>,
    /// Per-request override of job params, carried opaquely since only the
    /// fetch loop interprets it.
    pub job_param_override: Option<AttrMap>,
    pub cache_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionMetrics {
    pub iterations: u32,
    pub ajax_requests_resolved: u32,
    pub duration_ms: f64,
}

/// Status, error code & message, product/category/cart lists, link map,
/// unresolved AJAX requests, overriding web-response status, wrapper-filter
/// booleans, extraction-metrics block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResponse {
    pub status: i32,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    #[serde(default)]
    pub products: Vec<AttrMap>,
    #[serde(default)]
    pub categories: Vec<AttrMap>,
    #[serde(default)]
    pub carts: Vec<AttrMap>,
    #[serde(default)]
    pub links: HashMap<String, AttrMap>,
    #[serde(default)]
    pub unresolved_ajax_requests: Vec<UnresolvedAjaxRequest>,
    pub override_web_response_status: Option<i32>,
    #[serde(default)]
    pub wrapper_filter_product_url: bool,
    #[serde(default)]
    pub wrapper_filter_search_url: bool,
    pub metrics: Option<ExtractionMetrics>,
}

impl ExtractionResponse {
    pub fn is_success(&self) -> bool {
        self.status != 0 && self.error_code.is_none()
    }

    pub fn has_pending_ajax(&self) -> bool {
        !self.unresolved_ajax_requests.is_empty()
    }
}

/// Status, headers, content, response size, redirect, cookie, screenshot
/// paths, and round-trip timing for one proxy-service call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebResponse {
    pub status: i32,
    pub success: bool,
    pub url: String,
    pub redirect: Option<String>,
    pub content: String,
    pub response_size: usize,
    pub time_taken: f64,
    pub cookie: Option<String>,
    #[serde(default)]
    pub screenshot_path: Vec<String>,
    pub x_node_pool: Option<String>,
    pub x_render_pool: Option<String>,
    pub error: Option<String>,
}

impl WebResponse {
    /// success (2xx), permanent error (4xx non-transient), or transient
    /// (5xx / timeouts / aborted / rate-limited-by-peer).
    pub fn is_transient_status(&self) -> bool {
        matches!(self.status, 500..=599) || self.status == 0
    }

    pub fn is_permanent_error_status(&self) -> bool {
        matches!(self.status, 400..=499)
    }

    pub fn is_success_status(&self) -> bool {
        matches!(self.status, 200..=299)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_matches_fetch_loop_rules() {
        let mut resp = WebResponse { status: 200, ..Default::default() };
        assert!(resp.is_success_status());
        resp.status = 404;
        assert!(resp.is_permanent_error_status());
        resp.status = 503;
        assert!(resp.is_transient_status());
    }

    #[test]
    fn extraction_success_requires_status_and_no_error_code() {
        let ok = ExtractionResponse { status: 1, ..Default::default() };
        assert!(ok.is_success());
        let failed = ExtractionResponse { status: 1, error_code: Some("X".into()), ..Default::default() };
        assert!(!failed.is_success());
    }
}
