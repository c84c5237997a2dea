//! Generic rate-limited-actor-backed commercial API source.
//! Products arrive directly from the third-party API, so `extract` is a
//! no-op — everything happens in `request`: a single unbucketed batch queue
//! gated by the per-second rate limiter, dispatching through the injected
//! `CommercialApiClient`.

use crate::traits::Source;
use async_trait::async_trait;
use productcrawl_reliability::{spawn_batched_actor, ActorHandle, BatchExecutor, CounterStore};
use productcrawl_types::{AttrMap, CrawlError, CrawlErrorCode, Workflow};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// The external API call a commercial source makes, abstracted so the wire
/// protocol (REST, SOAP, whatever the vendor speaks) stays out of scope.
#[async_trait]
pub trait CommercialApiClient: Send + Sync {
    async fn fetch_product(&self, url: &str) -> Result<AttrMap, CrawlError>;
}

struct CommercialExecutor {
    client: Arc<dyn CommercialApiClient>,
}

#[async_trait]
impl BatchExecutor<String, Result<AttrMap, CrawlError>> for CommercialExecutor {
    async fn execute(&self, requests: &[String]) -> Vec<Result<AttrMap, CrawlError>> {
        let mut results = Vec::with_capacity(requests.len());
        for url in requests {
            results.push(self.client.fetch_product(url).await);
        }
        results
    }
}

pub struct Commercial {
    name: String,
    actor: ActorHandle<String, Result<AttrMap, CrawlError>>,
    last_error_code: Mutex<Option<String>>,
}

impl Commercial {
    pub fn new(name: impl Into<String>, client: Arc<dyn CommercialApiClient>, counter_store: Arc<dyn CounterStore>) -> Self {
        let name = name.into();
        let actor = spawn_batched_actor(
            name.clone(),
            counter_store,
            Arc::new(CommercialExecutor { client }),
            1,
            Duration::from_secs(1),
            10,
            |_req: &String| (),
        );
        Self { name, actor, last_error_code: Mutex::new(None) }
    }

    fn set_error_code(&self, code: Option<&str>) {
        *self.last_error_code.lock().unwrap() = code.map(str::to_string);
    }
}

#[async_trait]
impl Source for Commercial {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_error_code(&self) -> Option<String> {
        self.last_error_code.lock().unwrap().clone()
    }

    async fn request(&self, url: &str, workflow: &mut Workflow) -> Result<bool, CrawlError> {
        let result = self.actor.call(url.to_string()).await?;
        let product = result.map_err(|err| {
            self.set_error_code(Some(err.code.as_str()));
            err
        })?;

        workflow.products = vec![product];
        if workflow.products.is_empty() {
            let code = "NO_PRODUCT_FROM_SOURCE";
            self.set_error_code(Some(code));
            return Err(CrawlError::new(
                CrawlErrorCode::Other(code),
                format!("{} request resulted in an empty products response", self.name),
            ));
        }

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
    use productcrawl_types::{JobParams, Value};

    struct StubClient;

    #[async_trait]
    impl CommercialApiClient for StubClient {
        async fn fetch_product(&self, url: &str) -> Result<AttrMap, CrawlError> {
            let mut product = AttrMap::new();
            product.insert("url".into(), Value::String(url.to_string()));
            Ok(product)
        }
    }

    #[tokio::test]
    async fn request_populates_single_product_from_api() {
        let source = Commercial::new("m101", Arc::new(StubClient), Arc::new(InMemoryCounterStore::new()));
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000);
        let can_extract = source.request("http://example.com/p1", &mut wf).await.unwrap();
        assert!(can_extract);
        assert_eq!(wf.products.len(), 1);
    }

    #[tokio::test]
    async fn extract_is_a_no_op() {
        let source = Commercial::new("m101", Arc::new(StubClient), Arc::new(InMemoryCounterStore::new()));
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000);
        source.extract("http://example.com/p1", &mut wf).await.unwrap();
        assert!(wf.products.is_empty());
    }
}
