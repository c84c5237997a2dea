//! The pipeline contract: seven per-job-type implementations of
//! the same eleven decision points around a shared executor spine, plus
//! the default implementations of those decision points most strategies
//! share unchanged.

use crate::context::PipelineContext;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use productcrawl_types::{CrawlError, CrawlErrorCode, JobParams, Workflow};
use regex::Regex;
use std::collections::HashMap;

static EXTRACTION_TIMEOUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"failed CE rpc call: .*: RPC_TIMEOUT").unwrap());
static EXTRACTION_SITE_STATUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"CE rpc failed for .*: Site is in .* status").unwrap());

/// What `prepare_request_cfg` hands the fetch loop: everything
/// `construct_payload` needs, plus the cache-key/folder/expiry/event the
/// fetch loop injects into the request policy.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub url: String,
    pub domain: String,
    pub is_ajax: bool,
    pub priority: bool,
    pub crumb: Option<String>,
    pub headers: HashMap<String, String>,
    pub page_transforms: Vec<String>,
    pub pools: Vec<String>,
    pub sleep: u32,
    pub timeout: u32,
    pub request_policy: String,
    pub cookie: Option<String>,
    pub cache_key: Option<String>,
    pub cache_folder: String,
    pub cache_event: Option<String>,
    pub cache_expiry: Option<i64>,
}

/// What `pre_crawl_ops` resolves from a raw task string.
#[derive(Debug, Clone)]
pub struct PreCrawlOutcome {
    pub url: String,
    pub op: String,
    pub link_type: Option<String>,
}

/// The per-job-type overrides around the shared executor spine (spec
/// §4.H). Implemented as an interface with seven implementations, never as
/// inheritance.
#[async_trait]
pub trait PipelineStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parses the jobserver task to identify url and op; discovery overrides
    /// this to also annotate ancestor/parent tags on the batch's task
    /// metadata.
    fn pre_crawl_ops(&self, task: &str, workflow: &mut Workflow) -> Result<PreCrawlOutcome, CrawlError> {
        default_pre_crawl_ops(task)
    }

    /// Whether to pre-load the KV record before the merge engine runs.
    fn should_read_from_store(&self, _workflow: &Workflow) -> bool;

    /// Enforces site-detail presence and the strategy's allowed site-status
    /// set for supervised extraction.
    fn validate_domain_info(&self, workflow: &Workflow) -> Result<(), CrawlError>;

    /// Whether the fetched page is worth extracting from; `Ok(false)` means
    /// stop without failing the workflow (e.g. a discontinued product page).
    fn validate_web_response(&self, workflow: &Workflow) -> Result<bool, CrawlError> {
        default_validate_web_response(workflow)
    }

    /// Post-extraction sanity checks (empty product list, redirect-sku
    /// changes, unsupervised "not a product page" signals).
    fn validate_extraction(&self, workflow: &mut Workflow) -> Result<(), CrawlError> {
        Ok(())
    }

    fn prepare_request_cfg(&self, workflow: &Workflow) -> Result<RequestConfig, CrawlError> {
        let mut cfg = default_prepare_request_config(workflow)?;
        cfg.cache_expiry = Some(self.cache_expiry_secs());
        Ok(cfg)
    }

    fn should_read_from_cache(&self, _workflow: &Workflow) -> bool {
        false
    }

    fn cache_expiry_secs(&self) -> i64;

    /// Rewrites an internal code/message pair to the external contract
    /// before it leaves the process. The sole rewriter of codes.
    fn transform_error(&self, err: CrawlError) -> CrawlError {
        err
    }

    fn should_post_ops_on_failure(&self, _workflow: &Workflow) -> bool {
        false
    }

    /// Side effects run after a successful merge (and, if
    /// `should_post_ops_on_failure`, after a failed one too).
    async fn post_crawl_ops(&self, task: &str, workflow: &mut Workflow, ctx: &PipelineContext) -> Result<(), CrawlError>;
}

/// `parseTask`-backed default: every strategy except discovery just echoes
/// the task's parsed op/url through unchanged.
pub fn default_pre_crawl_ops(task: &str) -> Result<PreCrawlOutcome, CrawlError> {
    let parsed = productcrawl_utils::parse_task(task)
        .ok_or_else(|| CrawlError::new(CrawlErrorCode::BadInput, format!("could not parse task {task}")))?;
    Ok(PreCrawlOutcome { url: parsed.url, op: parsed.op, link_type: parsed.link_type })
}

/// `ValidateDomainInfoForSupervised`: for supervised (WRAPPER-only)
/// extraction, site-detail must be present and `site_status` must match one
/// of `allowed`. Unsupervised/mixed data sources skip this check entirely.
pub fn validate_domain_info_for_supervised(workflow: &Workflow, allowed: &[&str]) -> Result<(), CrawlError> {
    let extraction_mode = extraction_mode(&workflow.job_params);
    if extraction_mode != "WRAPPER" {
        return Ok(());
    }

    let Some(info) = workflow.domain_info.as_ref() else {
        return Err(CrawlError::new(CrawlErrorCode::NoSiteDetail, "no domain info resolved"));
    };
    if info.site_detail.is_none() {
        return Err(CrawlError::new(
            CrawlErrorCode::NoSiteDetail,
            format!("no sitedetail found for {}", info.domain_name),
        ));
    }
    if !info.status_allowed(allowed) {
        return Err(CrawlError::new(
            CrawlErrorCode::SiteStatusCheckFailed,
            format!("could not process request for {} in {} state", info.domain_name, info.site_status),
        ));
    }
    Ok(())
}

/// Shared message-pattern rewrites every strategy but realtime and generic
/// applies before its own code-specific rewrites: an extraction RPC timeout
/// or a site-status mismatch surfaced from the extraction service gets
/// reclassified regardless of which code it first carried.
pub fn rewrite_extraction_patterns(err: CrawlError) -> CrawlError {
    if EXTRACTION_TIMEOUT.is_match(&err.message) {
        return err.rewrite(CrawlErrorCode::ExtractionRpcTimeout);
    }
    if EXTRACTION_SITE_STATUS.is_match(&err.message) {
        return err.rewrite(CrawlErrorCode::SiteStatusCheckFailed);
    }
    err
}

/// `GetExtractionMode`: `"WRAPPER"` when the only configured data source is
/// the supervised wrapper, else a mixed/unsupervised mode marker.
pub fn extraction_mode(job_params: &JobParams) -> &'static str {
    if job_params.data_sources.len() == 1 && job_params.data_sources[0] == "WRAPPER" {
        "WRAPPER"
    } else {
        "MIXED"
    }
}

/// `DefaultValidateWebResponse`: 2xx can always extract; 5xx/0 is a
/// transient failure; 4xx extracts only when the job asked to extract from
/// permanent errors (discontinued-product detection).
pub fn default_validate_web_response(workflow: &Workflow) -> Result<bool, CrawlError> {
    let Some(web) = workflow.web_response.as_ref() else {
        return Ok(false);
    };
    if web.is_success_status() {
        return Ok(true);
    }
    if web.is_transient_status() {
        return Err(CrawlError::new(
            CrawlErrorCode::Http500Error,
            format!("failed to crawl {}: {}", workflow.url, web.status),
        ));
    }
    if web.is_permanent_error_status() {
        return Ok(workflow.job_params.extract_data);
    }
    Ok(false)
}

/// `DefaultPrepareRequestConfig`: a bare request config derived from the
/// workflow's URL/site, with no cache directives filled in yet (the
/// strategy's `prepare_request_cfg` layers its TTL on top, and the executor
/// fills in the cache key once it's computed).
pub fn default_prepare_request_config(workflow: &Workflow) -> Result<RequestConfig, CrawlError> {
    let site = workflow
        .domain_info
        .as_ref()
        .map(|d| d.domain_name.clone())
        .unwrap_or_default();
    let mut cfg = RequestConfig {
        url: workflow.url.clone(),
        domain: site,
        cache_folder: "ce".to_string(),
        timeout: 60,
        ..Default::default()
    };
    if workflow.job_params.extract_data {
        cfg.cache_event = Some("on_success_or_perm_error".to_string());
    }
    Ok(cfg)
}
