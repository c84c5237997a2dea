//! Domain info: site metadata resolved per URL from an external service.

use serde::{Deserialize, Serialize};

/// Site-specific extraction configuration, resolved from the domain-info
/// service alongside `DomainInfo`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wrapper {
    pub id: String,
    pub browser: String,
    #[serde(default)]
    pub page_transforms: Vec<String>,
}

/// Metadata about a site: URL filters, translation flags, status,
/// image-handling overrides, and a search-wrapper id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteDetail {
    pub url_filter: Option<String>,
    pub search_url_filter: Option<String>,
    #[serde(default)]
    pub translate: bool,
    #[serde(default)]
    pub translate_job_types: Vec<String>,
    /// Fields translated when `translate` is enabled (e.g. `name`, `description`).
    #[serde(default)]
    pub translation_fields: Vec<String>,
    pub translation_source: Option<String>,
    pub translation_target: Option<String>,
    /// Whether a cache miss is allowed to fall through to a live RPC call.
    #[serde(default)]
    pub translation_rpc_switch: bool,
    pub image_handling_override: Option<String>,
    pub search_wrapper_id: Option<String>,
    #[serde(default)]
    pub skus_only_default: bool,
    #[serde(default)]
    pub crawl_category_links: bool,
}

/// Site name, parent identifier, is-product/search-URL flags, canonical URL,
/// site status, extraction mode hint, wrapper, and site detail. Obtained per
/// URL from an external service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainInfo {
    pub domain_name: String,
    pub parent_identifier: Option<String>,
    pub is_product_url: bool,
    pub is_search_url: bool,
    pub canonical_url: Option<String>,
    pub site_status: String,
    pub extraction_mode: Option<String>,
    pub wrapper: Wrapper,
    pub site_detail: Option<SiteDetail>,
}

impl DomainInfo {
    /// Whether `site_status` matches one of the allowed regex-equivalent
    /// alternatives for a strategy (e.g. `ACTIVE|RE_SORT`).
    pub fn status_allowed(&self, allowed: &[&str]) -> bool {
        allowed.iter().any(|s| *s == self.site_status)
    }

    pub fn translate_enabled_for(&self, job_type: &str) -> bool {
        self.site_detail
            .as_ref()
            .map(|sd| sd.translate && sd.translate_job_types.iter().any(|jt| jt == job_type))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_allowed_checks_membership() {
        let mut d = DomainInfo::default();
        d.site_status = "RE_SORT".into();
        assert!(d.status_allowed(&["ACTIVE", "RE_SORT"]));
        assert!(!d.status_allowed(&["ACTIVE"]));
    }

    #[test]
    fn translate_enabled_requires_job_type_match() {
        let mut d = DomainInfo::default();
        d.site_detail = Some(SiteDetail {
            translate: true,
            translate_job_types: vec!["recrawl".into()],
            ..Default::default()
        });
        assert!(d.translate_enabled_for("recrawl"));
        assert!(!d.translate_enabled_for("realtime"));
    }
}
