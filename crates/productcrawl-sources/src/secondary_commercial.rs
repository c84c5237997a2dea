//! Second commercial API source, same rate-limited-actor shape as
//! [`crate::commercial`] but bucketed per-domain rather than globally, and
//! using the calling site's error-code naming from `sources/diffbot`
//! (`DIFFBOT_EXTRACTION_FAILED`) rather than m101's.

use crate::traits::Source;
use async_trait::async_trait;
use productcrawl_reliability::{spawn_batched_actor, ActorHandle, BatchExecutor, CounterStore};
use productcrawl_types::{AttrMap, CrawlError, CrawlErrorCode, Workflow};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[async_trait]
pub trait SecondaryCommercialApiClient: Send + Sync {
    async fn fetch_product(&self, domain: &str, url: &str) -> Result<AttrMap, CrawlError>;
}

#[derive(Debug, Clone)]
struct DomainRequest {
    url: String,
    domain: String,
}

struct SecondaryExecutor {
    client: Arc<dyn SecondaryCommercialApiClient>,
}

#[async_trait]
impl BatchExecutor<DomainRequest, Result<AttrMap, CrawlError>> for SecondaryExecutor {
    async fn execute(&self, requests: &[DomainRequest]) -> Vec<Result<AttrMap, CrawlError>> {
        let mut results = Vec::with_capacity(requests.len());
        for req in requests {
            results.push(self.client.fetch_product(&req.domain, &req.url).await);
        }
        results
    }
}

pub struct SecondaryCommercial {
    name: String,
    actor: ActorHandle<DomainRequest, Result<AttrMap, CrawlError>>,
    last_error_code: Mutex<Option<String>>,
}

impl SecondaryCommercial {
    pub fn new(name: impl Into<String>, client: Arc<dyn SecondaryCommercialApiClient>, counter_store: Arc<dyn CounterStore>) -> Self {
        let name = name.into();
        let actor = spawn_batched_actor(
            name.clone(),
            counter_store,
            Arc::new(SecondaryExecutor { client }),
            5,
            Duration::from_secs(1),
            10,
            |req: &DomainRequest| req.domain.clone(),
        );
        Self { name, actor, last_error_code: Mutex::new(None) }
    }

    fn set_error_code(&self, code: Option<&str>) {
        *self.last_error_code.lock().unwrap() = code.map(str::to_string);
    }
}

#[async_trait]
impl Source for SecondaryCommercial {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_error_code(&self) -> Option<String> {
        self.last_error_code.lock().unwrap().clone()
    }

    async fn request(&self, url: &str, workflow: &mut Workflow) -> Result<bool, CrawlError> {
        let domain = workflow.domain_info.as_ref().map(|d| d.domain_name.clone()).unwrap_or_default();
        let result = self.actor.call(DomainRequest { url: url.to_string(), domain }).await?;

        let product = result.map_err(|err| {
            let code = if err.code.as_str().is_empty() { "SECONDARY_EXTRACTION_FAILED" } else { err.code.as_str() };
            self.set_error_code(Some(code));
            err
        })?;

        workflow.products = vec![product];
        self.set_error_code(None);
        Ok(true)
    }

    async fn extract(&self, _url: &str, _workflow: &mut Workflow) -> Result<(), CrawlError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_reliability::InMemoryCounterStore;
    use productcrawl_types::{DomainInfo, JobParams, Value};

    struct StubClient;

    #[async_trait]
    impl SecondaryCommercialApiClient for StubClient {
        async fn fetch_product(&self, _domain: &str, url: &str) -> Result<AttrMap, CrawlError> {
            let mut product = AttrMap::new();
            product.insert("url".into(), Value::String(url.to_string()));
            Ok(product)
        }
    }

    #[tokio::test]
    async fn request_populates_product_bucketed_by_domain() {
        let source = SecondaryCommercial::new("diffbot", Arc::new(StubClient), Arc::new(InMemoryCounterStore::new()));
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000);
        wf.domain_info = Some(DomainInfo { domain_name: "example.com".into(), ..Default::default() });
        let can_extract = source.request("http://example.com/p1", &mut wf).await.unwrap();
        assert!(can_extract);
        assert_eq!(wf.products.len(), 1);
    }

    #[tokio::test]
    async fn extract_is_a_no_op() {
        let source = SecondaryCommercial::new("diffbot", Arc::new(StubClient), Arc::new(InMemoryCounterStore::new()));
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000);
        source.extract("http://example.com/p1", &mut wf).await.unwrap();
        assert!(wf.products.is_empty());
    }
}
