//! Thin method-specific wrappers over `QueuedRpcClient`: one trait impl per
//! RPC client (extraction, translation, the M101 and Diffbot actors'
//! clients), all sharing the same Redis-queue transport.

use super::redis_rpc::QueuedRpcClient;
use async_trait::async_trait;
use productcrawl_sources::{CommercialApiClient, ExtractionRpcClient, SecondaryCommercialApiClient, UnsupervisedFetch};
use productcrawl_translate::TranslationRpcClient;
use productcrawl_types::{AttrMap, CrawlError, CrawlErrorCode, ExtractionResponse, Workflow};
use serde::{Deserialize, Serialize};

fn rpc_err(code: CrawlErrorCode, err: anyhow::Error) -> CrawlError {
    CrawlError::new(code, err.to_string())
}

pub struct RedisExtractionRpcClient {
    client: QueuedRpcClient,
}

impl RedisExtractionRpcClient {
    pub fn new(client: QueuedRpcClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct ExtractSupervisedArgs<'a> {
    url: &'a str,
    job_type: &'a str,
    domain: &'a str,
}

#[derive(Serialize)]
struct FetchUnsupervisedArgs<'a> {
    url: &'a str,
    request_id: Option<&'a str>,
}

#[derive(Serialize)]
struct ExtractUnsupervisedArgs<'a> {
    url: &'a str,
    job_type: &'a str,
}

#[async_trait]
impl ExtractionRpcClient for RedisExtractionRpcClient {
    async fn extract_supervised(&self, url: &str, workflow: &Workflow) -> Result<ExtractionResponse, CrawlError> {
        let domain = workflow.domain_info.as_ref().map(|d| d.domain_name.as_str()).unwrap_or_default();
        let args = ExtractSupervisedArgs { url, job_type: &workflow.job_type, domain };
        self.client
            .call("extract_supervised", args)
            .await
            .map_err(|e| rpc_err(CrawlErrorCode::ExtractionRpcTimeout, e))
    }

    async fn fetch_unsupervised_content(&self, url: &str, request_id: Option<&str>) -> Result<UnsupervisedFetch, CrawlError> {
        let args = FetchUnsupervisedArgs { url, request_id };
        self.client
            .call("fetch_unsupervised_content", args)
            .await
            .map_err(|e| rpc_err(CrawlErrorCode::ExtractionRpcTimeout, e))
    }

    async fn extract_unsupervised(&self, url: &str, workflow: &Workflow) -> Result<ExtractionResponse, CrawlError> {
        let args = ExtractUnsupervisedArgs { url, job_type: &workflow.job_type };
        self.client
            .call("extract_unsupervised", args)
            .await
            .map_err(|e| rpc_err(CrawlErrorCode::ExtractionRpcTimeout, e))
    }
}

pub struct RedisTranslationRpcClient {
    client: QueuedRpcClient,
}

impl RedisTranslationRpcClient {
    pub fn new(client: QueuedRpcClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct TranslateArgs<'a> {
    text: &'a str,
    source: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    text: String,
}

#[async_trait]
impl TranslationRpcClient for RedisTranslationRpcClient {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, CrawlError> {
        let args = TranslateArgs { text, source, target };
        let resp: TranslateResponse = self
            .client
            .call("translate", args)
            .await
            .map_err(|e| rpc_err(CrawlErrorCode::Other("TRANSLATION_RPC_FAIL"), e))?;
        Ok(resp.text)
    }
}

/// Commercial-feed RPC client, queried through the rate-limited `Commercial`
/// source actor (one call per second, globally).
pub struct RedisCommercialApiClient {
    client: QueuedRpcClient,
}

impl RedisCommercialApiClient {
    pub fn new(client: QueuedRpcClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct FetchProductArgs<'a> {
    url: &'a str,
}

#[async_trait]
impl CommercialApiClient for RedisCommercialApiClient {
    async fn fetch_product(&self, url: &str) -> Result<AttrMap, CrawlError> {
        let args = FetchProductArgs { url };
        self.client
            .call("fetch_product", args)
            .await
            .map_err(|e| rpc_err(CrawlErrorCode::Other("COMMERCIAL_RPC_FAIL"), e))
    }
}

pub struct RedisSecondaryCommercialApiClient {
    client: QueuedRpcClient,
}

impl RedisSecondaryCommercialApiClient {
    pub fn new(client: QueuedRpcClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct FetchProductForDomainArgs<'a> {
    domain: &'a str,
    url: &'a str,
}

#[async_trait]
impl SecondaryCommercialApiClient for RedisSecondaryCommercialApiClient {
    async fn fetch_product(&self, domain: &str, url: &str) -> Result<AttrMap, CrawlError> {
        let args = FetchProductForDomainArgs { domain, url };
        self.client
            .call("fetch_product", args)
            .await
            .map_err(|e| rpc_err(CrawlErrorCode::Other("SECONDARY_COMMERCIAL_RPC_FAIL"), e))
    }
}
