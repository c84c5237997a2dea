//! The test-wrapper pipeline strategy: exercises a wrapper's extraction
//! rules without the downstream merge/translate/side-effect stages.

use crate::context::PipelineContext;
use crate::strategy::{default_prepare_request_config, default_validate_web_response, PipelineStrategy, RequestConfig};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use productcrawl_sideeffects::get_new_old_variations;
use productcrawl_types::{CrawlError, CrawlErrorCode, Workflow};
use regex::Regex;

const CACHE_EXPIRY_SECS: i64 = 24 * 60 * 60;

static FIELD_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[[^\]]*\]").unwrap());
static FIELD_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\([^)]*\)$").unwrap());

pub struct TestWrapperStrategy;

#[async_trait]
impl PipelineStrategy for TestWrapperStrategy {
    fn name(&self) -> &'static str {
        "testwrapper"
    }

    fn should_read_from_store(&self, workflow: &Workflow) -> bool {
        workflow.job_params.as_recrawl
    }

    /// Site can be in any status, or have none at all, for a new wrapper
    /// under test — so no status check is enforced here.
    fn validate_domain_info(&self, workflow: &Workflow) -> Result<(), CrawlError> {
        if workflow.domain_info.is_none() {
            return Err(CrawlError::new(CrawlErrorCode::NoSiteDetail, "no domain info resolved"));
        }
        Ok(())
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

    fn transform_error(&self, err: CrawlError) -> CrawlError {
        crate::strategy::rewrite_extraction_patterns(err)
    }

    fn should_post_ops_on_failure(&self, _workflow: &Workflow) -> bool {
        false
    }

    async fn post_crawl_ops(&self, _task: &str, workflow: &mut Workflow, _ctx: &PipelineContext) -> Result<(), CrawlError> {
        if let Some(source) = &workflow.extraction_data_source {
            if source != "WRAPPER" {
                tracing::info!(source, "SKIPPING_TESTWRAPPER_ACTIONS");
                return Ok(());
            }
        }

        if workflow.job_params.as_recrawl {
            let (_new, old) = get_new_old_variations(workflow);
            workflow.products = old;
            if let Some(message) = workflow.failure_message.clone() {
                return Err(CrawlError::new(CrawlErrorCode::Other("AS_RECRAWL_FAILED"), message));
            }
        }

        if !workflow.products.is_empty() {
            let mut errors = Vec::new();
            let mut warnings = Vec::new();
            for product in &workflow.products {
                validate_raw_data(product, &mut errors, &mut warnings);
            }
            workflow.validation_errors = dedup_and_strip(errors);
        }

        Ok(())
    }
}

/// Stand-in for the data-validation library: flags a product row missing
/// both `name` and `price`, the two fields every extraction is expected to
/// surface.
fn validate_raw_data(product: &productcrawl_types::AttrMap, errors: &mut Vec<String>, _warnings: &mut [String]) {
    if product.get("name").is_none() {
        errors.push("[name] field is missing (required)".to_string());
    }
    if product.get("price").is_none() {
        errors.push("[price] field is missing (required)".to_string());
    }
}

fn dedup_and_strip(errors: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    errors
        .into_iter()
        .map(|e| {
            let e = FIELD_PREFIX.replace(&e, "").to_string();
            FIELD_SUFFIX.replace(&e, "").trim().to_string()
        })
        .filter(|e| seen.insert(e.clone()))
        .collect()
}
