//! The wrapper-QA pipeline strategy: validates a wrapper's extraction
//! output against expectations rather than running a full crawl.

use crate::context::PipelineContext;
use crate::strategy::{default_prepare_request_config, default_validate_web_response, validate_domain_info_for_supervised, PipelineStrategy, RequestConfig};
use async_trait::async_trait;
use productcrawl_types::{CrawlError, Workflow};

const ALLOWED_SITE_STATUS: &[&str] = &["ACTIVE", "RE_SORT", "PAUSE", "RECRAWL"];
const CACHE_EXPIRY_SECS: i64 = 12 * 60 * 60;

/// A wrapper-under-QA crawl: reads straight through without the recrawl
/// side effects (rdstore, discovery, publishing) a production crawl runs.
pub struct QaStrategy;

#[async_trait]
impl PipelineStrategy for QaStrategy {
    fn name(&self) -> &'static str {
        "wrapperqa"
    }

    fn should_read_from_store(&self, _workflow: &Workflow) -> bool {
        true
    }

    fn validate_domain_info(&self, workflow: &Workflow) -> Result<(), CrawlError> {
        validate_domain_info_for_supervised(workflow, ALLOWED_SITE_STATUS)
    }

    fn validate_web_response(&self, workflow: &Workflow) -> Result<bool, CrawlError> {
        default_validate_web_response(workflow)
    }

    fn validate_extraction(&self, _workflow: &mut Workflow) -> Result<(), CrawlError> {
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

    /// QA runs default to a live fetch; the `cache` job param opts a run
    /// back into reading a prior cached response.
    fn should_read_from_cache(&self, workflow: &Workflow) -> bool {
        workflow.job_params.cache
    }

    fn transform_error(&self, err: CrawlError) -> CrawlError {
        crate::strategy::rewrite_extraction_patterns(err)
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
    fn accepts_pause_and_recrawl_statuses() {
        let strategy = QaStrategy;
        for status in ["ACTIVE", "RE_SORT", "PAUSE", "RECRAWL"] {
            let mut wf = Workflow::new("http://example.com/p1".into(), "wrapperqa".into(), JobParams::default(), 0);
            wf.domain_info = Some(DomainInfo { site_status: status.into(), ..Default::default() });
            assert!(strategy.validate_domain_info(&wf).is_ok(), "status {status} should be allowed");
        }
    }

    #[test]
    fn cache_read_follows_job_param() {
        let strategy = QaStrategy;
        let mut wf = Workflow::new("http://example.com/p1".into(), "wrapperqa".into(), JobParams::default(), 0);
        assert!(!strategy.should_read_from_cache(&wf));
        wf.job_params.cache = true;
        assert!(strategy.should_read_from_cache(&wf));
    }
}
