//! The realtime-API pipeline strategy: a synchronous single-URL crawl that
//! also splits new/old variations before returning.

use crate::context::PipelineContext;
use crate::strategy::{default_prepare_request_config, extraction_mode, PipelineStrategy, RequestConfig};
use async_trait::async_trait;
use productcrawl_sideeffects::get_new_old_variations;
use productcrawl_types::{CrawlError, CrawlErrorCode, Value, Workflow};

const CACHE_EXPIRY_SECS: i64 = 60 * 60;

pub struct RealtimeStrategy;

#[async_trait]
impl PipelineStrategy for RealtimeStrategy {
    fn name(&self) -> &'static str {
        "realtime"
    }

    fn should_read_from_store(&self, _workflow: &Workflow) -> bool {
        false
    }

    fn validate_domain_info(&self, workflow: &Workflow) -> Result<(), CrawlError> {
        let Some(info) = workflow.domain_info.as_ref() else {
            return Err(CrawlError::new(CrawlErrorCode::NoSiteDetail, "no domain info resolved"));
        };
        let Some(site_detail) = info.site_detail.as_ref() else {
            return Ok(());
        };

        let mode = extraction_mode(&workflow.job_params);
        if mode == "WRAPPER" {
            if workflow.job_params.use_search_wrapper {
                if !info.is_product_url && site_detail.search_wrapper_id.is_some() && !info.is_search_url {
                    return Err(CrawlError::new(
                        CrawlErrorCode::Other("NOT_SEARCH_PAGE"),
                        format!("use_search_wrapper was set and url {} is neither a product page nor a search page", workflow.url),
                    ));
                }
                if info.is_search_url && site_detail.search_wrapper_id.is_none() {
                    return Err(CrawlError::new(
                        CrawlErrorCode::Other("DOMAININFO_SEARCH_WRAPPERID_EMPTY"),
                        format!("no search_wrapper_id present in sitedetail for site {}", info.domain_name),
                    ));
                }
            } else if !info.is_product_url {
                return Err(CrawlError::new(
                    CrawlErrorCode::NotProductPage,
                    format!("url {} not a product page and use_search_wrapper not set", workflow.url),
                ));
            }
        } else if !info.is_product_url {
            return Err(CrawlError::new(CrawlErrorCode::NotProductPage, format!("url {} not a product page", workflow.url)));
        }
        Ok(())
    }

    fn prepare_request_cfg(&self, workflow: &Workflow) -> Result<RequestConfig, CrawlError> {
        let mut cfg = default_prepare_request_config(workflow)?;
        cfg.cache_expiry = Some(self.cache_expiry_secs());
        Ok(cfg)
    }

    fn cache_expiry_secs(&self) -> i64 {
        CACHE_EXPIRY_SECS
    }

    fn validate_extraction(&self, workflow: &mut Workflow) -> Result<(), CrawlError> {
        if workflow.extraction_data_source.as_deref() == Some("UNSUPERVISED") || workflow.extraction_data_source.as_deref() == Some("DIFFBOT") {
            if workflow.validation_errors.iter().any(|e| e == "NOT_PRODUCT_PAGE") {
                return Err(CrawlError::new(
                    CrawlErrorCode::NotProductPage,
                    format!("unsupervised has detected the url {} to be not a product page", workflow.url),
                ));
            }
        }

        if workflow.failure_type.is_some() {
            return Ok(());
        }

        let status = workflow.web_response.as_ref().map(|w| w.status).unwrap_or(0);
        if (400..500).contains(&status) {
            return Err(CrawlError::new(
                CrawlErrorCode::DoesNotExist,
                format!("web crawl for url {} failed with a permanent error (status code: {})", workflow.url, status),
            ));
        }
        let is_search_url = workflow.domain_info.as_ref().is_some_and(|d| d.is_search_url);
        if workflow.products.is_empty() && !is_search_url {
            return Err(CrawlError::new(
                CrawlErrorCode::NotProductPage,
                format!("no products could be extracted for {}", workflow.url),
            ));
        }
        Ok(())
    }

    fn transform_error(&self, err: CrawlError) -> CrawlError {
        let err = match err.code.as_str() {
            "HTTP_500_ERROR" => err.rewrite(CrawlErrorCode::Unreachable),
            "EXTRACTION_SITEDETAIL_EMPTY" | "EXTRACTION_WRAPPER_EMPTY" => err.rewrite(CrawlErrorCode::DomainNotSupported),
            _ => err,
        };
        err.with_prefix("REALTIME_")
    }

    fn should_post_ops_on_failure(&self, _workflow: &Workflow) -> bool {
        false
    }

    async fn post_crawl_ops(&self, _task: &str, workflow: &mut Workflow, _ctx: &PipelineContext) -> Result<(), CrawlError> {
        if let Some(source) = &workflow.extraction_data_source {
            if source != "WRAPPER" {
                tracing::info!(source, "SKIPPING_REALTIME_ACTIONS");
                return Ok(());
            }
        }
        if workflow.job_type.contains("webhooks") {
            tracing::info!(job_type = %workflow.job_type, "SKIPPING_REALTIME_ACTIONS");
            return Ok(());
        }

        if workflow.job_type == "webhooks_daily" || workflow.job_type == "webhooks_hourly" {
            let (_new, old) = get_new_old_variations(workflow);
            workflow.products = old;
        }

        if workflow.job_type == "realtimeapi" {
            rewrite_magento_sku_as_variation_id(&mut workflow.products);
        }

        Ok(())
    }
}

/// Vader needs the magento SKU, when present, surfaced as `variation_id` so
/// it can run sale analytics without further changes on its end.
fn rewrite_magento_sku_as_variation_id(products: &mut [productcrawl_types::AttrMap]) {
    let has_magento_sku = products
        .first()
        .and_then(|p| p.get("magento_sku"))
        .and_then(Value::as_str)
        .is_some_and(|s| !s.is_empty());
    if !has_magento_sku {
        return;
    }
    for product in products.iter_mut() {
        if let Some(sku) = product.get("magento_sku").cloned() {
            product.insert("variation_id".to_string(), sku);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_types::{AttrMap, DomainInfo, JobParams};

    fn workflow_product_url() -> Workflow {
        let mut wf = Workflow::new("http://example.com/p1".into(), "realtimeapi".into(), JobParams::default(), 0);
        wf.job_params.data_sources = vec!["WRAPPER".into()];
        wf.domain_info = Some(DomainInfo { domain_name: "example.com".into(), is_product_url: true, ..Default::default() });
        wf
    }

    #[test]
    fn rejects_non_product_url_without_search_wrapper() {
        let strategy = RealtimeStrategy;
        let mut wf = workflow_product_url();
        wf.domain_info.as_mut().unwrap().is_product_url = false;
        wf.domain_info.as_mut().unwrap().site_detail = Some(Default::default());
        let err = strategy.validate_domain_info(&wf).unwrap_err();
        assert_eq!(err.code, CrawlErrorCode::NotProductPage);
    }

    #[test]
    fn transform_error_prefixes_realtime() {
        let strategy = RealtimeStrategy;
        let err = CrawlError::new(CrawlErrorCode::Http500Error, "boom");
        let transformed = strategy.transform_error(err);
        assert_eq!(transformed.wire_code(), "REALTIME_UNREACHABLE");
    }

    #[test]
    fn magento_sku_rewrites_variation_id_for_realtimeapi() {
        let mut product = AttrMap::new();
        product.insert("magento_sku".into(), Value::String("M-1".into()));
        let mut products = vec![product];
        rewrite_magento_sku_as_variation_id(&mut products);
        assert_eq!(products[0].get("variation_id").and_then(Value::as_str), Some("M-1"));
    }

    #[test]
    fn no_magento_sku_leaves_products_untouched() {
        let mut products = vec![AttrMap::new()];
        rewrite_magento_sku_as_variation_id(&mut products);
        assert!(products[0].get("variation_id").is_none());
    }
}
