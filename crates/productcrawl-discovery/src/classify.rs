//! Step 2 of the link filter: classify one wrapper-extracted
//! URL as product/category/sitemap plus an operation tag, applying the
//! category skip rules.

use productcrawl_types::{CrawlError, CrawlErrorCode, DomainInfo, JobParams};
use productcrawl_utils::{is_product_url, is_sitemap_url, is_url, LinkClass};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLink {
    pub url: String,
    pub class: LinkClass,
    pub op: String,
}

/// `link_type` comes from the wrapper's per-link metadata (`""`, `content`,
/// `product`, or some other tag the wrapper invented); only the first three
/// are treated as eligible for the product classification.
pub fn classify_url(output_url: &str, parent_task: &str, link_type: Option<&str>, job_params: &JobParams, domain_info: &DomainInfo) -> Result<ClassifiedLink, CrawlError> {
    if !is_url(output_url) {
        return Err(CrawlError::new(
            CrawlErrorCode::Other("BAD_URL_EXTRACTED"),
            format!("parent {parent_task}, output link {output_url}"),
        ));
    }

    if is_sitemap_url(output_url) {
        return Ok(ClassifiedLink { url: output_url.to_string(), class: LinkClass::Sitemap, op: "sitemap".to_string() });
    }

    let filters: Vec<String> = domain_info.site_detail.as_ref().and_then(|sd| sd.url_filter.clone()).into_iter().collect();
    let is_product = is_product_url(output_url, &filters);
    let link_type_eligible = matches!(link_type, None | Some("") | Some("content") | Some("product"));

    let (class, mut op) = if is_product && link_type_eligible {
        let op = match domain_info.extraction_mode.as_deref() {
            Some("api") => "api".to_string(),
            _ => "crawl".to_string(),
        };
        (LinkClass::Product, op)
    } else {
        (LinkClass::Category, "crawl".to_string())
    };

    if class == LinkClass::Category {
        if job_params.no_category_crawl {
            op = "SKIP_DONT_CRAWL_CATEGORY".to_string();
        } else if is_sitemap_url(parent_task) {
            op = "SKIP_CATEGORY_PAGE_FROM_SITEMAP".to_string();
        }
    }

    Ok(ClassifiedLink { url: output_url.to_string(), class, op })
}
