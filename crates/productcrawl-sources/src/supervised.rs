//! Supervised (wrapper-driven) backend: owns its own cache read/write and
//! retry, fans out AJAX requests the extractor reports, and aggregates
//! per-iteration extraction metrics.

use crate::traits::{ExtractionRpcClient, Source};
use async_trait::async_trait;
use productcrawl_cache::{construct_cache_id, CacheKeyConfig, CacheStorage, DEFAULT_FOLDER};
use productcrawl_fetch::{fetch_page, FetchLoopConfig, PayloadInputs, ProxyClient};
use productcrawl_reliability::RetryPolicy;
use productcrawl_types::{
    metrics::ExtractionMetrics as ExtractionMetricsSample, CrawlError, CrawlErrorCode, Workflow,
};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// AJAX fan-out is capped at this many re-extraction iterations.
const MAX_AJAX_ITERATIONS: u32 = 20;

pub struct Supervised {
    name: String,
    proxy: Arc<ProxyClient>,
    cache: Arc<dyn CacheStorage>,
    rpc: Arc<dyn ExtractionRpcClient>,
    last_error_code: Mutex<Option<String>>,
}

impl Supervised {
    pub fn new(name: impl Into<String>, proxy: Arc<ProxyClient>, cache: Arc<dyn CacheStorage>, rpc: Arc<dyn ExtractionRpcClient>) -> Self {
        Self { name: name.into(), proxy, cache, rpc, last_error_code: Mutex::new(None) }
    }

    fn set_error_code(&self, code: Option<&str>) {
        *self.last_error_code.lock().unwrap() = code.map(str::to_string);
    }
}

#[async_trait]
impl Source for Supervised {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_error_code(&self) -> Option<String> {
        self.last_error_code.lock().unwrap().clone()
    }

    async fn request(&self, url: &str, workflow: &mut Workflow) -> Result<bool, CrawlError> {
        let domain_info = match workflow.domain_info.clone() {
            Some(d) => d,
            None => {
                let err = CrawlError::new(CrawlErrorCode::DomainNotSupported, format!("{url} has no domain info"));
                self.set_error_code(Some(err.code.as_str()));
                return Err(err);
            }
        };

        if domain_info.site_detail.is_none() {
            let err = CrawlError::new(
                CrawlErrorCode::DomainNotSupported,
                format!("{} doesn't have any site detail present", domain_info.domain_name),
            );
            self.set_error_code(Some(err.code.as_str()));
            return Err(err);
        }

        // Built once and fed into both the cache key and the payload, so the
        // two can never drift apart the way two independently-constructed
        // copies could.
        let headers: std::collections::HashMap<String, String> = Default::default();
        let request_policy = String::new();
        let cookie: Option<String> = None;

        let cache_cfg = CacheKeyConfig {
            url: url.to_string(),
            domain: domain_info.domain_name.clone(),
            headers: headers.clone().into_iter().collect(),
            request_policy: request_policy.clone(),
            cookie: cookie.clone().unwrap_or_default(),
            request_id: workflow.request_id.clone(),
        };
        let cache_key = construct_cache_id(DEFAULT_FOLDER, &workflow.job_type, &domain_info.domain_name, &cache_cfg);
        workflow.cache_key = Some(cache_key.clone());

        let payload = productcrawl_fetch::construct_payload(PayloadInputs {
            url,
            domain: &domain_info.domain_name,
            job_type: &workflow.job_type,
            is_ajax: false,
            priority: workflow.job_params.priority_request == 1,
            crumb: None,
            headers,
            page_transforms: domain_info.wrapper.page_transforms.clone(),
            pools: Vec::new(),
            sleep: 0,
            timeout: 30,
            request_policy,
            cookie,
            cache_key: Some(&cache_key),
            cache_expiry: Some(productcrawl_cache::DEFAULT_TTL_SECS),
            cache_event: None,
        });

        let read_from_cache = !workflow.job_params.disable_cache;
        let retry = if workflow.job_params.disable_retry { RetryPolicy::single_attempt() } else { RetryPolicy::default() };
        let config = FetchLoopConfig { read_from_cache, retry, ..FetchLoopConfig::default() };
        let now = workflow.crawl_timestamp;
        let response = fetch_page(&self.proxy, self.cache.as_ref(), &cache_key, &payload, config, now).await;

        let can_extract = response.is_success_status() || response.success;
        workflow.web_response = Some(response.clone());

        if response.is_permanent_error_status() {
            let code = format!("HTTP_{}", response.status);
            self.set_error_code(Some(&code));
            return Err(CrawlError::new(CrawlErrorCode::Other("HTTP_ERROR"), format!("{url} returned {}", response.status)));
        }
        if response.is_transient_status() {
            self.set_error_code(Some("HTTP_500"));
            return Err(CrawlError::new(CrawlErrorCode::Http500Error, format!("{url} returned transient status {}", response.status)));
        }

        self.set_error_code(None);
        Ok(can_extract)
    }

    async fn extract(&self, url: &str, workflow: &mut Workflow) -> Result<(), CrawlError> {
        let mut response = self.rpc.extract_supervised(url, workflow).await.map_err(|err| {
            self.set_error_code(Some(err.code.as_str()));
            err
        })?;

        let mut iterations = 0u32;
        while response.has_pending_ajax() && iterations < MAX_AJAX_ITERATIONS {
            iterations += 1;
            for ajax in std::mem::take(&mut response.unresolved_ajax_requests) {
                let ajax_cache_key = ajax.cache_key.clone().unwrap_or_else(|| format!("ce/ajax/{}/{iterations}", workflow.job_type));
                let payload = productcrawl_fetch::construct_payload(PayloadInputs {
                    url: &ajax.url,
                    domain: workflow.domain_info.as_ref().map(|d| d.domain_name.as_str()).unwrap_or_default(),
                    job_type: &workflow.job_type,
                    is_ajax: true,
                    priority: false,
                    crumb: None,
                    headers: ajax.headers.clone(),
                    page_transforms: Vec::new(),
                    pools: Vec::new(),
                    sleep: 0,
                    timeout: ajax.timeout.unwrap_or(30),
                    request_policy: String::new(),
                    cookie: ajax.cookie.clone(),
                    cache_key: Some(&ajax_cache_key),
                    cache_expiry: Some(productcrawl_cache::DEFAULT_TTL_SECS),
                    cache_event: None,
                });
                let ajax_retry = if workflow.job_params.disable_retry { RetryPolicy::single_attempt() } else { RetryPolicy::default() };
                let ajax_response = fetch_page(
                    &self.proxy,
                    self.cache.as_ref(),
                    &ajax_cache_key,
                    &payload,
                    FetchLoopConfig { retry: ajax_retry, ..FetchLoopConfig::default() },
                    workflow.crawl_timestamp,
                )
                .await;
                workflow.web_response = Some(ajax_response);
            }

            response = self.rpc.extract_supervised(url, workflow).await.map_err(|err| {
                self.set_error_code(Some(err.code.as_str()));
                err
            })?;
        }

        if response.has_pending_ajax() {
            warn!(url, iterations, "EXTRACTION_MAX_CYCLES_EXCEEDED");
            let err = CrawlError::new(CrawlErrorCode::ExtractionMaxCyclesExceeded, format!("{url} exceeded {MAX_AJAX_ITERATIONS} AJAX iterations"));
            self.set_error_code(Some(err.code.as_str()));
            return Err(err);
        }

        if let Some(status_override) = response.override_web_response_status {
            if let Some(wr) = workflow.web_response.as_mut() {
                wr.status = status_override;
            }
        }

        let duration_ms = response.metrics.as_ref().map(|m| m.duration_ms).unwrap_or_default();
        workflow.extraction_metrics.push(ExtractionMetricsSample {
            iteration: iterations,
            duration_ms,
            source: self.name.clone(),
            ..Default::default()
        });

        if !response.is_success() {
            let code = response.error_code.clone().unwrap_or_else(|| "EXTRACTION_FAILED".to_string());
            self.set_error_code(Some(&code));
            let err = CrawlError::new(
                CrawlErrorCode::ExtractionFailed,
                response.error_message.clone().unwrap_or_else(|| "extraction failed".to_string()),
            );
            workflow.extraction = Some(response);
            return Err(err);
        }

        workflow.products = response.products.clone();
        workflow.extraction = Some(response);
        self.set_error_code(None);
        info!(url, "SUPERVISED_EXTRACT_DONE");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use productcrawl_cache::InMemoryCacheStorage;
    use productcrawl_types::{DomainInfo, ExtractionResponse, JobParams, SiteDetail};

    struct StubRpc;

    #[async_trait]
    impl ExtractionRpcClient for StubRpc {
        async fn extract_supervised(&self, _url: &str, _workflow: &Workflow) -> Result<ExtractionResponse, CrawlError> {
            Ok(ExtractionResponse { status: 1, ..Default::default() })
        }
        async fn fetch_unsupervised_content(&self, _url: &str, _request_id: Option<&str>) -> Result<crate::traits::UnsupervisedFetch, CrawlError> {
            unreachable!("not exercised by supervised tests")
        }
        async fn extract_unsupervised(&self, _url: &str, _workflow: &Workflow) -> Result<ExtractionResponse, CrawlError> {
            unreachable!("not exercised by supervised tests")
        }
    }

    fn new_workflow_with_site_detail() -> Workflow {
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000);
        wf.domain_info = Some(DomainInfo { domain_name: "example.com".into(), site_detail: Some(SiteDetail::default()), ..Default::default() });
        wf
    }

    #[tokio::test]
    async fn request_fails_fast_without_site_detail() {
        let source = Supervised::new(
            "example_wrapper",
            Arc::new(ProxyClient::new("127.0.0.1:1")),
            Arc::new(InMemoryCacheStorage::new()),
            Arc::new(StubRpc),
        );
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000);
        wf.domain_info = Some(DomainInfo::default());
        let result = source.request("http://example.com/p1", &mut wf).await;
        assert!(result.is_err());
        assert_eq!(source.last_error_code().as_deref(), Some("DOMAIN_NOT_SUPPORTED"));
    }

    #[tokio::test]
    async fn extract_collects_products_on_success() {
        let source = Supervised::new(
            "example_wrapper",
            Arc::new(ProxyClient::new("127.0.0.1:1")),
            Arc::new(InMemoryCacheStorage::new()),
            Arc::new(StubRpc),
        );
        let mut wf = new_workflow_with_site_detail();
        source.extract("http://example.com/p1", &mut wf).await.unwrap();
        assert!(wf.extraction.unwrap().is_success());
    }
}
