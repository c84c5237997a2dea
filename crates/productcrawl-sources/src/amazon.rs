//! Amazon PA-API source: locale-bucketed item lookups through the shared
//! rate-limited actor, plus the `realtimeapi` variations-first branch.

use crate::traits::Source;
use async_trait::async_trait;
use productcrawl_reliability::{spawn_batched_actor, ActorHandle, BatchExecutor, CounterStore};
use productcrawl_types::{AttrMap, CrawlError, CrawlErrorCode, Value, Workflow};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Locale-item lookup against the PA-API, the seam a real signed client
/// plugs into.
#[async_trait]
pub trait AmazonApiClient: Send + Sync {
    async fn get_items(&self, locale: &str, asins: &[String]) -> Vec<Result<AttrMap, CrawlError>>;
    async fn get_variations(&self, locale: &str, url: &str) -> Result<Vec<AttrMap>, CrawlError>;
}

/// Derives a bucketing locale from the URL's TLD. The ASIN itself is read
/// from `workflow.domain_info` instead, since that's already resolved
/// upstream in this codebase.
fn locale_from_url(url: &str) -> String {
    let host = url
        .split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or(url);
    match host.rsplit('.').next() {
        Some("co") | Some("com") | None => "us".to_string(),
        Some(tld) => tld.to_string(),
    }
}

#[derive(Debug, Clone)]
struct ItemRequest {
    url: String,
    asin: String,
    locale: String,
}

struct ItemExecutor {
    client: Arc<dyn AmazonApiClient>,
}

#[async_trait]
impl BatchExecutor<ItemRequest, Result<AttrMap, CrawlError>> for ItemExecutor {
    async fn execute(&self, requests: &[ItemRequest]) -> Vec<Result<AttrMap, CrawlError>> {
        if requests.is_empty() {
            return Vec::new();
        }
        let locale = requests[0].locale.clone();
        let asins: Vec<String> = requests.iter().map(|r| r.asin.clone()).collect();
        self.client.get_items(&locale, &asins).await
    }
}

pub struct Amazon {
    name: String,
    client: Arc<dyn AmazonApiClient>,
    items_actor: ActorHandle<ItemRequest, Result<AttrMap, CrawlError>>,
    last_error_code: Mutex<Option<String>>,
}

impl Amazon {
    pub fn new(name: impl Into<String>, client: Arc<dyn AmazonApiClient>, counter_store: Arc<dyn CounterStore>) -> Self {
        let name = name.into();
        let items_actor = spawn_batched_actor(
            name.clone(),
            counter_store,
            Arc::new(ItemExecutor { client: client.clone() }),
            10,
            Duration::from_secs(1),
            10,
            |req: &ItemRequest| req.locale.clone(),
        );
        Self { name, client, items_actor, last_error_code: Mutex::new(None) }
    }

    fn set_error_code(&self, code: Option<&str>) {
        *self.last_error_code.lock().unwrap() = code.map(str::to_string);
    }

    async fn get_items(&self, url: &str, asin: &str) -> Result<Vec<AttrMap>, CrawlError> {
        let locale = locale_from_url(url);
        let product = self.items_actor.call(ItemRequest { url: url.to_string(), asin: asin.to_string(), locale }).await??;
        Ok(vec![product])
    }
}

#[async_trait]
impl Source for Amazon {
    fn name(&self) -> &str {
        &self.name
    }

    fn last_error_code(&self) -> Option<String> {
        self.last_error_code.lock().unwrap().clone()
    }

    async fn request(&self, url: &str, workflow: &mut Workflow) -> Result<bool, CrawlError> {
        let job_type = workflow.job_type.clone();
        let queried_asin = workflow.domain_info.as_ref().and_then(|d| d.parent_identifier.clone()).unwrap_or_default();

        let products = if job_type == "realtimeapi" {
            let locale = locale_from_url(url);
            match self.client.get_variations(&locale, url).await {
                Ok(variations) if !variations.is_empty() => {
                    let asin_present = !queried_asin.is_empty()
                        && variations.iter().any(|p| p.get("sku").and_then(Value::as_str) == Some(queried_asin.as_str()));
                    if !asin_present && !queried_asin.is_empty() {
                        // Queried ASIN missing from the variations family: fetch
                        // it directly, carry over the displaced original
                        // leading item's variation_id onto it so it still
                        // reports as part of the family, then push that
                        // displaced item to the end instead of discarding it.
                        match self.get_items(url, &queried_asin).await {
                            Ok(mut fetched) => {
                                let mut variations = variations;
                                let displaced = variations.remove(0);
                                if let Some(item) = fetched.first_mut() {
                                    if let Some(variation_id) = displaced.get("variation_id").cloned() {
                                        item.insert("variation_id".to_string(), variation_id);
                                    }
                                }
                                fetched.extend(variations);
                                fetched.push(displaced);
                                fetched
                            }
                            Err(_) => variations,
                        }
                    } else {
                        variations
                    }
                }
                _ => self.get_items(url, &queried_asin).await.map_err(|err| {
                    self.set_error_code(Some(err.code.as_str()));
                    err
                })?,
            }
        } else {
            self.get_items(url, &queried_asin).await.map_err(|err| {
                self.set_error_code(Some(err.code.as_str()));
                err
            })?
        };

        workflow.products = products;
        if workflow.products.is_empty() {
            let code = "AMAZON_NO_PRODUCTS_ERR";
            self.set_error_code(Some(code));
            return Err(CrawlError::new(
                CrawlErrorCode::Other(code),
                "AMAZON PAAPI request resulted in an empty products response",
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
    use productcrawl_types::{DomainInfo, JobParams};

    struct StubClient;

    #[async_trait]
    impl AmazonApiClient for StubClient {
        async fn get_items(&self, _locale: &str, asins: &[String]) -> Vec<Result<AttrMap, CrawlError>> {
            asins
                .iter()
                .map(|asin| {
                    let mut product = AttrMap::new();
                    product.insert("sku".into(), Value::String(asin.clone()));
                    Ok(product)
                })
                .collect()
        }
        async fn get_variations(&self, _locale: &str, _url: &str) -> Result<Vec<AttrMap>, CrawlError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn request_falls_back_to_items_when_no_variations() {
        let source = Amazon::new("amazon", Arc::new(StubClient), Arc::new(InMemoryCounterStore::new()));
        let mut wf = Workflow::new("http://amazon.com/dp/B001".into(), "recrawl".into(), JobParams::default(), 1_000);
        wf.domain_info = Some(DomainInfo { parent_identifier: Some("B001".into()), ..Default::default() });
        let can_extract = source.request("http://amazon.com/dp/B001", &mut wf).await.unwrap();
        assert!(can_extract);
        assert_eq!(wf.products.len(), 1);
    }

    #[test]
    fn locale_from_url_defaults_to_us_for_dot_com() {
        assert_eq!(locale_from_url("http://www.amazon.com/dp/B001"), "us");
        assert_eq!(locale_from_url("http://www.amazon.co.uk/dp/B001"), "uk");
    }

    struct VariationsClient;

    #[async_trait]
    impl AmazonApiClient for VariationsClient {
        async fn get_items(&self, _locale: &str, asins: &[String]) -> Vec<Result<AttrMap, CrawlError>> {
            asins
                .iter()
                .map(|asin| {
                    let mut product = AttrMap::new();
                    product.insert("sku".into(), Value::String(asin.clone()));
                    Ok(product)
                })
                .collect()
        }

        async fn get_variations(&self, _locale: &str, _url: &str) -> Result<Vec<AttrMap>, CrawlError> {
            let mut p0 = AttrMap::new();
            p0.insert("sku".into(), Value::String("B999".into()));
            p0.insert("variation_id".into(), Value::String("vid-family".into()));
            let mut p1 = AttrMap::new();
            p1.insert("sku".into(), Value::String("B998".into()));
            Ok(vec![p0, p1])
        }
    }

    #[tokio::test]
    async fn realtimeapi_reorders_displaced_item_to_end_and_copies_variation_id() {
        let source = Amazon::new("amazon", Arc::new(VariationsClient), Arc::new(InMemoryCounterStore::new()));
        let mut wf = Workflow::new("http://amazon.com/dp/B001".into(), "realtimeapi".into(), JobParams::default(), 1_000);
        wf.domain_info = Some(DomainInfo { parent_identifier: Some("B001".into()), ..Default::default() });
        source.request("http://amazon.com/dp/B001", &mut wf).await.unwrap();

        assert_eq!(wf.products.len(), 3);
        assert_eq!(wf.products[0].get("sku").and_then(Value::as_str), Some("B001"));
        assert_eq!(wf.products[0].get("variation_id").and_then(Value::as_str), Some("vid-family"));
        assert_eq!(wf.products[1].get("sku").and_then(Value::as_str), Some("B998"));
        assert_eq!(wf.products[2].get("sku").and_then(Value::as_str), Some("B999"));
    }
}
