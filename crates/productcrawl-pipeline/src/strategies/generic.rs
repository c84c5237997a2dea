//! The fallback pipeline strategy, used when a job type names no dedicated
//! strategy.

use crate::context::PipelineContext;
use crate::strategy::{default_prepare_request_config, default_validate_web_response, validate_domain_info_for_supervised, PipelineStrategy, RequestConfig};
use async_trait::async_trait;
use productcrawl_types::{CrawlError, CrawlErrorCode, Workflow};

const ALLOWED_SITE_STATUS: &[&str] = &["ACTIVE", "RE_SORT", "INDEXING"];
const CACHE_EXPIRY_SECS: i64 = 24 * 60 * 60;

pub struct CrawlStrategy;

#[async_trait]
impl PipelineStrategy for CrawlStrategy {
    fn name(&self) -> &'static str {
        "crawl"
    }

    fn should_read_from_store(&self, _workflow: &Workflow) -> bool {
        false
    }

    fn validate_domain_info(&self, workflow: &Workflow) -> Result<(), CrawlError> {
        validate_domain_info_for_supervised(workflow, ALLOWED_SITE_STATUS)
    }

    fn validate_web_response(&self, workflow: &Workflow) -> Result<bool, CrawlError> {
        default_validate_web_response(workflow)
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
        let mut cfg = default_prepare_request_config(workflow)?;
        cfg.cache_expiry = Some(self.cache_expiry_secs());
        Ok(cfg)
    }

    fn cache_expiry_secs(&self) -> i64 {
        CACHE_EXPIRY_SECS
    }

    fn should_read_from_cache(&self, _workflow: &Workflow) -> bool {
        false
    }

    /// No wire-level rewriting; a generic crawl surfaces whatever code the
    /// fetch/merge stages produced.
    fn transform_error(&self, err: CrawlError) -> CrawlError {
        err
    }

    fn should_post_ops_on_failure(&self, _workflow: &Workflow) -> bool {
        false
    }

    async fn post_crawl_ops(&self, _task: &str, _workflow: &mut Workflow, _ctx: &PipelineContext) -> Result<(), CrawlError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_types::{DomainInfo, JobParams};

    #[test]
    fn transform_error_is_a_no_op() {
        let strategy = CrawlStrategy;
        let err = CrawlError::new(CrawlErrorCode::Http500Error, "boom");
        let transformed = strategy.transform_error(err.clone());
        assert_eq!(transformed.code, err.code);
        assert_eq!(transformed.wire_code(), err.wire_code());
    }

    #[test]
    fn rejects_sites_outside_allowed_status() {
        let strategy = CrawlStrategy;
        let mut wf = Workflow::new("http://example.com/p1".into(), "crawl".into(), JobParams { data_sources: vec!["WRAPPER".into()], ..Default::default() }, 0);
        wf.domain_info = Some(DomainInfo { site_status: "PAUSE".into(), site_detail: Some(Default::default()), ..Default::default() });
        assert!(strategy.validate_domain_info(&wf).is_err());
    }
}
