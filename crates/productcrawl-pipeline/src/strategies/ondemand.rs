//! The on-demand crawl pipeline strategy, for single-URL requests that
//! skip the regular job-queue path.

use crate::context::PipelineContext;
use crate::strategy::{
    default_prepare_request_config, default_validate_web_response, validate_domain_info_for_supervised, PipelineStrategy, PreCrawlOutcome,
    RequestConfig,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use productcrawl_events::OnDemandResultMessage;
use productcrawl_types::{CrawlError, CrawlErrorCode, Workflow};
use regex::Regex;

const ALLOWED_SITE_STATUS: &[&str] = &["ACTIVE", "RE_SORT", "INDEXING"];
const CACHE_EXPIRY_SECS: i64 = 60 * 60;

static LINE_NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ln_(\d+);(.*)$").unwrap());

pub struct OnDemandStrategy;

#[async_trait]
impl PipelineStrategy for OnDemandStrategy {
    fn name(&self) -> &'static str {
        "ondemand"
    }

    fn pre_crawl_ops(&self, task: &str, _workflow: &mut Workflow) -> Result<PreCrawlOutcome, CrawlError> {
        if let Some(caps) = LINE_NUMBERED.captures(task) {
            caps[1]
                .parse::<u64>()
                .map_err(|err| CrawlError::new(CrawlErrorCode::BadInput, err.to_string()))?;
            return Ok(PreCrawlOutcome { url: caps[2].to_string(), op: "crawl".to_string(), link_type: None });
        }
        if productcrawl_utils::is_url(task) {
            return Ok(PreCrawlOutcome { url: task.to_string(), op: "crawl".to_string(), link_type: None });
        }
        Err(CrawlError::new(CrawlErrorCode::BadInput, format!("could not parse task {task}")))
    }

    fn should_read_from_store(&self, _workflow: &Workflow) -> bool {
        false
    }

    fn validate_domain_info(&self, workflow: &Workflow) -> Result<(), CrawlError> {
        validate_domain_info_for_supervised(workflow, ALLOWED_SITE_STATUS)
    }

    fn validate_web_response(&self, workflow: &Workflow) -> Result<bool, CrawlError> {
        let can_extract = default_validate_web_response(workflow)?;
        let Some(web) = workflow.web_response.as_ref() else { return Ok(can_extract) };
        if web.is_permanent_error_status() {
            if !workflow.job_params.extract_data {
                return Err(CrawlError::new(
                    CrawlErrorCode::DoesNotExist,
                    format!("web crawl for url {} failed with a permanent error (status code: {})", workflow.url, web.status),
                ));
            }
            return Ok(true);
        }
        Ok(can_extract)
    }

    fn prepare_request_cfg(&self, workflow: &Workflow) -> Result<RequestConfig, CrawlError> {
        let mut cfg = default_prepare_request_config(workflow)?;
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
        true
    }

    async fn post_crawl_ops(&self, task: &str, workflow: &mut Workflow, ctx: &PipelineContext) -> Result<(), CrawlError> {
        if let Some(source) = &workflow.extraction_data_source {
            if source != "WRAPPER" {
                tracing::info!(source, "SKIPPING_ONDEMAND_ACTIONS");
                return Ok(());
            }
        }

        let request_line = task
            .strip_prefix("ln_")
            .and_then(|rest| rest.split(';').next())
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);

        let message = OnDemandResultMessage {
            request_line,
            url: workflow.url.clone(),
            success: workflow.success,
            products: workflow.products.clone(),
            failure_type: workflow.failure_type.clone(),
            failure_message: workflow.failure_message.clone(),
        };
        let payload = serde_json::to_vec(&message).map_err(|err| CrawlError::new(CrawlErrorCode::Other("ONDEMAND_ENCODE_FAILED"), err.to_string()))?;
        ctx.ondemand_publisher
            .publish(&workflow.job_params.job_id, &payload)
            .await
            .map_err(|err| CrawlError::new(CrawlErrorCode::Other("ONDEMAND_PUBLISH_FAILED"), err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_line_numbered_task() {
        let strategy = OnDemandStrategy;
        let mut wf = Workflow::new(String::new(), "ondemand".into(), Default::default(), 0);
        let outcome = strategy.pre_crawl_ops("ln_3;http://example.com/p1", &mut wf).unwrap();
        assert_eq!(outcome.url, "http://example.com/p1");
    }

    #[test]
    fn parses_bare_url_task() {
        let strategy = OnDemandStrategy;
        let mut wf = Workflow::new(String::new(), "ondemand".into(), Default::default(), 0);
        let outcome = strategy.pre_crawl_ops("http://example.com/p1", &mut wf).unwrap();
        assert_eq!(outcome.url, "http://example.com/p1");
    }

    #[test]
    fn rejects_unparseable_task() {
        let strategy = OnDemandStrategy;
        let mut wf = Workflow::new(String::new(), "ondemand".into(), Default::default(), 0);
        assert!(strategy.pre_crawl_ops("not a task", &mut wf).is_err());
    }
}
