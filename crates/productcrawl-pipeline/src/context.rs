//! Collaborators the executor and strategies need beyond what a `Workflow`
//! already carries, bundled into one struct threaded through every pipeline
//! function.

use async_trait::async_trait;
use productcrawl_cache::CacheStorage;
use productcrawl_discovery::{JobServerLoader, ParentSkuLookup, PartialDomainInfoResolver, SpideringHistorySink};
use productcrawl_events::Publisher;
use productcrawl_fetch::proxy_client::ProxyClient;
use productcrawl_reliability::CounterStore;
use productcrawl_sideeffects::{DocumentStoreWriter, RdstoreWriter};
use productcrawl_sources::Source;
use productcrawl_translate::{SkusStore, TranslationRpcClient};
use productcrawl_types::{DomainInfo, JobParams, KvRecord};
use std::sync::Arc;

/// Resolves domain info (site metadata, wrapper, status) for a URL by
/// calling the wrapper service.
#[async_trait]
pub trait DomainInfoResolver: Send + Sync {
    async fn resolve(&self, url: &str, job_type: &str, job_params: &JobParams) -> anyhow::Result<DomainInfo>;
}

/// Reads a parent-identifier's KV record.
#[async_trait]
pub trait KvStoreReader: Send + Sync {
    async fn fetch(&self, site: &str, parent_identifier: &str) -> anyhow::Result<Option<KvRecord>>;
}

/// The site/job-type to data-source override hash, keyed by a Redis hash
/// field lookup against a webhook or realtime domain-source map.
#[async_trait]
pub trait DataSourceMapStore: Send + Sync {
    async fn get(&self, hash_key: &str, field: &str) -> anyhow::Result<Option<Vec<String>>>;
}

/// Every collaborator a pipeline run needs beyond the workflow itself.
pub struct PipelineContext {
    pub domain_info: Arc<dyn DomainInfoResolver>,
    pub kv_store: Arc<dyn KvStoreReader>,
    pub data_source_map: Arc<dyn DataSourceMapStore>,
    pub sources: Vec<(String, Arc<dyn Source>)>,
    pub cache: Arc<dyn CacheStorage>,
    pub proxy: Arc<ProxyClient>,
    pub rdstore_writer: Arc<dyn RdstoreWriter>,
    pub raw_publisher: Arc<dyn Publisher>,
    pub pp_publisher: Arc<dyn Publisher>,
    pub ondemand_publisher: Arc<dyn Publisher>,
    pub discovery_doc_store: Arc<dyn DocumentStoreWriter>,
    pub feedback_resolver: Arc<dyn PartialDomainInfoResolver>,
    pub parent_sku_lookup: Arc<dyn ParentSkuLookup>,
    pub job_server: Arc<dyn JobServerLoader>,
    pub spidering_history: Arc<dyn SpideringHistorySink>,
    pub skus_store: Arc<dyn SkusStore>,
    pub translate_rpc: Arc<dyn TranslationRpcClient>,
    pub counters: Arc<dyn CounterStore>,
}
