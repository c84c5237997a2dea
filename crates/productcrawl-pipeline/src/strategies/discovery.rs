//! The discovery pipeline strategy: crawls a category/sitemap page and
//! feeds the links it finds back into the job queue.

use crate::context::PipelineContext;
use crate::strategy::{
    default_prepare_request_config, default_validate_web_response, validate_domain_info_for_supervised, PipelineStrategy, PreCrawlOutcome,
    RequestConfig,
};
use async_trait::async_trait;
use productcrawl_discovery::{extract_sitemap_urls, filter_job_server_feedback_links};
use productcrawl_sideeffects::bulk_write_discovery;
use productcrawl_types::{AttrMap, CrawlError, CrawlErrorCode, Value, Workflow};
use productcrawl_utils::is_sitemap_url;

const ALLOWED_SITE_STATUS: &[&str] = &["ACTIVE", "RE_SORT", "INDEXING"];
const CACHE_EXPIRY_SECS: i64 = 3 * 24 * 60 * 60;

pub struct DiscoveryStrategy;

#[async_trait]
impl PipelineStrategy for DiscoveryStrategy {
    fn name(&self) -> &'static str {
        "discovery"
    }

    fn pre_crawl_ops(&self, task: &str, _workflow: &mut Workflow) -> Result<PreCrawlOutcome, CrawlError> {
        crate::strategy::default_pre_crawl_ops(task)
    }

    fn should_read_from_store(&self, _workflow: &Workflow) -> bool {
        true
    }

    fn validate_domain_info(&self, workflow: &Workflow) -> Result<(), CrawlError> {
        validate_domain_info_for_supervised(workflow, ALLOWED_SITE_STATUS)
    }

    fn validate_web_response(&self, workflow: &Workflow) -> Result<bool, CrawlError> {
        let can_extract = default_validate_web_response(workflow)?;
        if can_extract && is_sitemap_url(&workflow.url) {
            return Ok(false);
        }
        Ok(can_extract)
    }

    fn validate_extraction(&self, workflow: &mut Workflow) -> Result<(), CrawlError> {
        let web_success = workflow.web_response.as_ref().is_some_and(|w| w.is_success_status());
        if !web_success {
            return Ok(());
        }
        let is_product_url = workflow.domain_info.as_ref().is_some_and(|d| d.is_product_url);
        let site = workflow.domain_info.as_ref().map(|d| d.domain_name.as_str()).unwrap_or_default();
        if is_product_url && workflow.products.is_empty() && site != "amazon.com" {
            return Err(CrawlError::new(
                CrawlErrorCode::ExtractionFailedNoProds,
                format!("extraction returned 0 active prods for successful url {}", workflow.url),
            ));
        }
        Ok(())
    }

    fn prepare_request_cfg(&self, workflow: &Workflow) -> Result<RequestConfig, CrawlError> {
        if is_sitemap_url(&workflow.url) {
            let site = workflow.domain_info.as_ref().map(|d| d.domain_name.clone()).unwrap_or_default();
            return Ok(RequestConfig { url: workflow.url.clone(), domain: site, cache_folder: "ce".to_string(), timeout: 60, ..Default::default() });
        }
        let mut cfg = default_prepare_request_config(workflow)?;
        if workflow.job_params.extract_data {
            cfg.cache_event = Some("on_success_or_perm_error".to_string());
        }
        cfg.cache_expiry = Some(self.cache_expiry_secs());
        Ok(cfg)
    }

    fn cache_expiry_secs(&self) -> i64 {
        CACHE_EXPIRY_SECS
    }

    fn transform_error(&self, err: CrawlError) -> CrawlError {
        crate::strategy::rewrite_extraction_patterns(err)
    }

    fn should_post_ops_on_failure(&self, _workflow: &Workflow) -> bool {
        false
    }

    async fn post_crawl_ops(&self, task: &str, workflow: &mut Workflow, ctx: &PipelineContext) -> Result<(), CrawlError> {
        if let Some(source) = &workflow.extraction_data_source {
            if source != "WRAPPER" {
                tracing::info!(source, "SKIPPING_DISCOVERY_ACTIONS");
                return Ok(());
            }
        }

        // Sitemap short-circuit: the fetch response itself carries the
        // extracted `<loc>` URLs as feedback, not the wrapper's link map.
        if is_sitemap_url(&workflow.url) {
            if let Some(web) = workflow.web_response.clone() {
                let urls = extract_sitemap_urls(&web.content)?;
                let extraction = workflow.extraction.get_or_insert_with(Default::default);
                for url in urls {
                    let mut meta = AttrMap::new();
                    meta.insert("priority".to_string(), Value::Number(100.0));
                    extraction.links.insert(url, meta);
                }
            }
        }

        let _ = filter_job_server_feedback_links(
            workflow,
            task,
            ctx.feedback_resolver.as_ref(),
            ctx.parent_sku_lookup.as_ref(),
            ctx.spidering_history.as_ref(),
            ctx.job_server.as_ref(),
        )
        .await;

        let site = workflow.domain_info.as_ref().map(|d| d.domain_name.clone()).unwrap_or_default();
        let categories = workflow.extraction.as_ref().map(|e| e.categories.clone()).unwrap_or_default();
        bulk_write_discovery(
            ctx.discovery_doc_store.as_ref(),
            &site,
            &workflow.job_params.job_id,
            workflow.crawl_timestamp,
            &workflow.products,
            &categories,
        )
        .await
        .map_err(|err| CrawlError::new(CrawlErrorCode::Other("DISCOVERY_ACTIONS_FAILED"), err.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_types::{DomainInfo, JobParams};

    #[test]
    fn sitemap_task_cannot_extract_even_on_success() {
        let strategy = DiscoveryStrategy;
        let mut wf = Workflow::new("http://example.com/sitemap.xml".into(), "discovery".into(), JobParams::default(), 0);
        wf.domain_info = Some(DomainInfo::default());
        wf.web_response = Some(productcrawl_types::WebResponse { status: 200, ..Default::default() });
        assert!(!strategy.validate_web_response(&wf).unwrap());
    }

    #[test]
    fn non_sitemap_success_can_extract() {
        let strategy = DiscoveryStrategy;
        let mut wf = Workflow::new("http://example.com/p1".into(), "discovery".into(), JobParams::default(), 0);
        wf.web_response = Some(productcrawl_types::WebResponse { status: 200, ..Default::default() });
        assert!(strategy.validate_web_response(&wf).unwrap());
    }
}
