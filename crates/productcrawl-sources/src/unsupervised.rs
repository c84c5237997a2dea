//! AI-driven (unsupervised) backend: one RPC fetch whose HTML is cached
//! under `uce/` with a fixed one-hour TTL, then a separate RPC extraction
//! against the cached content.

use crate::traits::{ExtractionRpcClient, Source};
use async_trait::async_trait;
use productcrawl_cache::{construct_cache_id, write_cached_response, CacheKeyConfig, CacheStorage, UNSUPERVISED_FOLDER};
use productcrawl_types::{CrawlError, CrawlErrorCode, WebResponse, Workflow};
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct Unsupervised {
    name: String,
    cache: Arc<dyn CacheStorage>,
    rpc: Arc<dyn ExtractionRpcClient>,
    last_error_code: Mutex<Option<String>>,
}

impl Unsupervised {
    pub fn new(name: impl Into<String>, cache: Arc<dyn CacheStorage>, rpc: Arc<dyn ExtractionRpcClient>) -> Self {
        Self { name: name.into(), cache, rpc, last_error_code: Mutex::new(None) }
    }

    fn set_error_code(&self, code: Option<&str>) {
        *self.last_error_code.lock().unwrap() = code.map(str::to_string);
    }

    fn cache_key_for(url: &str, workflow: &Workflow) -> Option<String> {
        let domain_info = workflow.domain_info.as_ref()?;
        let cfg = CacheKeyConfig { url: url.to_string(), domain: domain_info.domain_name.clone(), request_id: workflow.request_id.clone(), ..Default::default() };
        Some(construct_cache_id(UNSUPERVISED_FOLDER, &workflow.job_type, &domain_info.domain_name, &cfg))
    }
}

#[async_trait]
impl Source for Unsupervised {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_error_code(&self) -> Option<String> {
        self.last_error_code.lock().unwrap().clone()
    }

    async fn request(&self, url: &str, workflow: &mut Workflow) -> Result<bool, CrawlError> {
        let cache_key = match Self::cache_key_for(url, workflow) {
            Some(key) => key,
            None => {
                let err = CrawlError::new(CrawlErrorCode::DomainNotSupported, format!("{url} has no domain info"));
                self.set_error_code(Some(err.code.as_str()));
                return Err(err);
            }
        };

        let fetched = self.rpc.fetch_unsupervised_content(url, workflow.request_id.as_deref()).await.map_err(|err| {
            self.set_error_code(Some(err.code.as_str()));
            err
        })?;

        if fetched.status == 0 {
            let code = fetched.error_code.clone().unwrap_or_else(|| "UNSUPERVISED_REQUEST_FAILED".to_string());
            self.set_error_code(Some(&code));
            return Err(CrawlError::new(
                CrawlErrorCode::Other("UNSUPERVISED_REQUEST_FAILED"),
                fetched.message.clone().unwrap_or_else(|| "unsupervised response status 0".to_string()),
            ));
        }

        let response = WebResponse { status: 200, success: true, url: url.to_string(), content: fetched.html.clone(), response_size: fetched.html.len(), ..Default::default() };

        write_cached_response(self.cache.as_ref(), &cache_key, &response, Some(productcrawl_cache::DEFAULT_TTL_SECS), workflow.crawl_timestamp)
            .await
            .map_err(|err| {
                let code = "UNSUPERVISED_WRITING_TO_CACHE_FAILED";
                self.set_error_code(Some(code));
                CrawlError::new(CrawlErrorCode::Other(code), format!("writing unsupervised response for {url} to the cache failed: {err}"))
            })?;

        info!(url, bytes = fetched.html.len(), "UNSUPERVISED_CACHE_WRITTEN");
        workflow.cache_key = Some(cache_key);
        workflow.web_response = Some(response);
        self.set_error_code(None);
        Ok(true)
    }

    async fn extract(&self, url: &str, workflow: &mut Workflow) -> Result<(), CrawlError> {
        let response = self.rpc.extract_unsupervised(url, workflow).await.map_err(|err| {
            let code = err.code.as_str().to_string();
            self.set_error_code(Some(if code.is_empty() { "UNSUPERVISED_RPC_ERR" } else { &code }));
            err
        })?;

        if !response.is_success() {
            let code = response.error_code.clone().unwrap_or_else(|| "UNSUPERVISED_RPC_ERR".to_string());
            self.set_error_code(Some(&code));
            let err = CrawlError::new(
                CrawlErrorCode::ExtractionFailed,
                response.error_message.clone().unwrap_or_else(|| "unsupervised extraction failed".to_string()),
            );
            workflow.extraction = Some(response);
            return Err(err);
        }

        workflow.products = response.products.clone();
        workflow.extraction = Some(response);
        self.set_error_code(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_cache::InMemoryCacheStorage;
    use productcrawl_types::{DomainInfo, ExtractionResponse, JobParams};

    struct StubRpc {
        fetch_status: i32,
    }

    #[async_trait]
    impl ExtractionRpcClient for StubRpc {
        async fn extract_supervised(&self, _url: &str, _workflow: &Workflow) -> Result<ExtractionResponse, CrawlError> {
            unreachable!("not exercised by unsupervised tests")
        }
        async fn fetch_unsupervised_content(&self, _url: &str, _request_id: Option<&str>) -> Result<crate::traits::UnsupervisedFetch, CrawlError> {
            Ok(crate::traits::UnsupervisedFetch { status: self.fetch_status, html: "<html>ok</html>".into(), ..Default::default() })
        }
        async fn extract_unsupervised(&self, _url: &str, _workflow: &Workflow) -> Result<ExtractionResponse, CrawlError> {
            Ok(ExtractionResponse { status: 1, ..Default::default() })
        }
    }

    fn new_workflow() -> Workflow {
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000);
        wf.domain_info = Some(DomainInfo { domain_name: "example.com".into(), ..Default::default() });
        wf
    }

    #[tokio::test]
    async fn request_writes_fetched_html_to_cache_under_uce_folder() {
        let cache = Arc::new(InMemoryCacheStorage::new());
        let source = Unsupervised::new("unsupervised", cache.clone(), Arc::new(StubRpc { fetch_status: 1 }));
        let mut wf = new_workflow();
        let can_extract = source.request("http://example.com/p1", &mut wf).await.unwrap();
        assert!(can_extract);
        assert!(wf.cache_key.as_deref().unwrap().starts_with("uce/recrawl/"));
    }

    #[tokio::test]
    async fn request_fails_when_fetch_status_is_zero() {
        let cache = Arc::new(InMemoryCacheStorage::new());
        let source = Unsupervised::new("unsupervised", cache, Arc::new(StubRpc { fetch_status: 0 }));
        let mut wf = new_workflow();
        let result = source.request("http://example.com/p1", &mut wf).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn extract_collects_products_on_success() {
        let cache = Arc::new(InMemoryCacheStorage::new());
        let source = Unsupervised::new("unsupervised", cache, Arc::new(StubRpc { fetch_status: 1 }));
        let mut wf = new_workflow();
        source.extract("http://example.com/p1", &mut wf).await.unwrap();
        assert!(wf.extraction.unwrap().is_success());
    }
}
