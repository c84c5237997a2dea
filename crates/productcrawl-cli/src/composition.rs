//! Composition root: wires `AppConfig` into a full `PipelineContext` plus
//! the `ctx.sources` vector. Every adapter here is swappable behind the
//! trait it implements; only this module knows about Redis, reqwest or UDP
//! sockets.

use crate::adapters::amazon_http::HttpAmazonApiClient;
use crate::adapters::http_domain::HttpDomainInfoResolver;
use crate::adapters::http_jobserver::HttpJobServerClient;
use crate::adapters::http_rdstore::HttpRdstoreWriter;
use crate::adapters::publisher::RedisListPublisher;
use crate::adapters::redis_rpc::{QueuedRpcClient, RedisRpcTransport};
use crate::adapters::redis_store::RedisStore;
use crate::adapters::rpc_clients::{
    RedisCommercialApiClient, RedisExtractionRpcClient, RedisSecondaryCommercialApiClient, RedisTranslationRpcClient,
};
use productcrawl_cache::HttpCacheStorage;
use productcrawl_fetch::ProxyClient;
use productcrawl_pipeline::PipelineContext;
use productcrawl_sources::{Amazon, Commercial, SecondaryCommercial, Source, Supervised, Unsupervised};
use std::sync::Arc;
use std::time::Duration;

const RAW_ETL_QUEUE: &str = "raw_etl";
const PP_ETL_QUEUE: &str = "pp_etl";
const ONDEMAND_ETL_QUEUE: &str = "ondemand_etl";

/// Builds the shared `PipelineContext` every worker and REST handler runs
/// `run_pipeline` against. Called once at startup.
pub fn build_pipeline_context(config: &productcrawl_config::AppConfig) -> anyhow::Result<Arc<PipelineContext>> {
    let rpc_timeout = Duration::from_secs(config.extraction_timeout_secs);

    let store = Arc::new(RedisStore::new(&config.redis_host_addr)?);
    let domain_resolver = Arc::new(HttpDomainInfoResolver::new(config.wrapper_service_uri.clone(), config.sitesdb_service_addr.clone()));
    let cache = Arc::new(HttpCacheStorage::new(config.cache_service_addr.clone()));
    let proxy = Arc::new(ProxyClient::new(config.proxy_router_addr.clone()));

    let extraction_transport = RedisRpcTransport::new(&config.redis_host_addr, rpc_timeout)?;
    let extraction_rpc = Arc::new(RedisExtractionRpcClient::new(QueuedRpcClient::new(extraction_transport, config.extraction_queue.clone())));

    let translate_transport = RedisRpcTransport::new(&config.redis_host_addr, rpc_timeout)?;
    let translate_rpc = Arc::new(RedisTranslationRpcClient::new(QueuedRpcClient::new(translate_transport, config.translate_queue.clone())));

    let commercial_transport = RedisRpcTransport::new(&config.redis_host_addr, rpc_timeout)?;
    let commercial_client = Arc::new(RedisCommercialApiClient::new(QueuedRpcClient::new(commercial_transport, "m101")));

    let secondary_transport = RedisRpcTransport::new(&config.redis_host_addr, rpc_timeout)?;
    let secondary_client = Arc::new(RedisSecondaryCommercialApiClient::new(QueuedRpcClient::new(secondary_transport, "diffbot")));

    let amazon_client = Arc::new(HttpAmazonApiClient::new(config.paapi_default.clone(), config.paapi_locale_overrides.clone()));

    let sources: Vec<(String, Arc<dyn Source>)> = vec![
        ("WRAPPER".to_string(), Arc::new(Supervised::new("WRAPPER", proxy.clone(), cache.clone(), extraction_rpc.clone()))),
        ("UCE".to_string(), Arc::new(Unsupervised::new("UCE", cache.clone(), extraction_rpc.clone()))),
        ("M101".to_string(), Arc::new(Commercial::new("M101", commercial_client, store.clone()))),
        ("AMAZON".to_string(), Arc::new(Amazon::new("AMAZON", amazon_client, store.clone()))),
        ("DIFFBOT".to_string(), Arc::new(SecondaryCommercial::new("DIFFBOT", secondary_client, store.clone()))),
    ];

    Ok(Arc::new(PipelineContext {
        domain_info: domain_resolver.clone(),
        kv_store: store.clone(),
        data_source_map: store.clone(),
        sources,
        cache,
        proxy,
        rdstore_writer: Arc::new(HttpRdstoreWriter::new(config.rest_rdstoreupdate_addr.clone())),
        raw_publisher: Arc::new(RedisListPublisher::new(&config.redis_host_addr, RAW_ETL_QUEUE)?),
        pp_publisher: Arc::new(RedisListPublisher::new(&config.redis_host_addr, PP_ETL_QUEUE)?),
        ondemand_publisher: Arc::new(RedisListPublisher::new(&config.redis_host_addr, ONDEMAND_ETL_QUEUE)?),
        discovery_doc_store: store.clone(),
        feedback_resolver: domain_resolver,
        parent_sku_lookup: store.clone(),
        job_server: Arc::new(HttpJobServerClient::new(config.jobserver_addr.clone())),
        spidering_history: store.clone(),
        skus_store: store.clone(),
        translate_rpc,
        counters: store,
    }))
}

/// A `JobServerLoader` + `QueueRequeuer` handle for the batch pool, built
/// alongside the pipeline context but addressed separately since it's a
/// pool-layer collaborator rather than a pipeline one.
pub fn build_job_server_client(config: &productcrawl_config::AppConfig) -> HttpJobServerClient {
    HttpJobServerClient::new(config.jobserver_addr.clone())
}
