//! URL classification: sitemap detection, product-URL matching against a
//! site's configured URL filters.

use crate::task::is_url;
use once_cell::sync::Lazy;
use regex::Regex;

static SITEMAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\.axd|\.xml|\.gz|sitemap\.cfm|sitemap\.ashx)").unwrap());

pub fn is_sitemap_url(url: &str) -> bool {
    is_url(url) && SITEMAP.is_match(url)
}

/// `isProductURL`: true iff `url` matches any of the site's configured URL
/// filter regexes. Filters that fail to compile are skipped, matching the
/// original's best-effort `ApplyRegexes`.
pub fn is_product_url(url: &str, filters: &[String]) -> bool {
    filters
        .iter()
        .filter_map(|f| Regex::new(f).ok())
        .any(|re| re.is_match(url))
}

/// The three-way classification used by the discovery link filter:
/// `product`, `category`, or `sitemap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkClass {
    Product,
    Category,
    Sitemap,
}

impl LinkClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkClass::Product => "product",
            LinkClass::Category => "category",
            LinkClass::Sitemap => "sitemap",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sitemap_detection_matches_known_extensions() {
        assert!(is_sitemap_url("http://example.com/sitemap.xml"));
        assert!(is_sitemap_url("http://example.com/sitemap_index.xml.gz"));
        assert!(!is_sitemap_url("http://example.com/product/123"));
    }

    #[test]
    fn product_url_checks_against_filters() {
        let filters = vec![r"/product/\d+".to_string()];
        assert!(is_product_url("http://example.com/product/42", &filters));
        assert!(!is_product_url("http://example.com/category/shoes", &filters));
    }
}
