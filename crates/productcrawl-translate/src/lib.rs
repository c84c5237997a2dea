//! # productcrawl-translate
//!
//! The translation sub-pipeline, run only when a site's detail
//! opts a job type into translation: build a cache of previously-translated
//! field values from a relational store, translate this crawl's products
//! against that cache (falling through to an RPC on a miss), and record
//! per-(job, field) stats counters.

pub mod apply;
pub mod cache;

pub use apply::{translate_fields, TranslationRpcClient};
pub use cache::{build_translation_cache, SkuRow, SkusStore, TranslatedVal, TranslationCache};

use productcrawl_reliability::CounterStore;
use productcrawl_types::{CrawlError, CrawlErrorCode, Workflow};

const TRANSLATION_OBJ_NAME: &str = "translation_metadata";

/// Whether this job type is opted into translation for the crawled site.
pub fn should_translate_for_job(workflow: &Workflow) -> bool {
    workflow
        .domain_info
        .as_ref()
        .is_some_and(|info| info.translate_enabled_for(&workflow.job_type))
}

/// Runs all three phases against `workflow.products`, leaving the
/// `translation_metadata` sub-map and translated field values in place.
pub async fn apply_translation(
    workflow: &mut Workflow,
    skus_store: &dyn SkusStore,
    rpc: &dyn TranslationRpcClient,
    counters: &dyn CounterStore,
) -> Result<(), CrawlError> {
    let Some(site_detail) = workflow.domain_info.as_ref().and_then(|info| info.site_detail.as_ref()) else {
        return Err(CrawlError::new(CrawlErrorCode::NoSiteDetail, "translation requires site detail"));
    };
    let translate_keys = site_detail.translation_fields.clone();
    let source = site_detail.translation_source.clone().unwrap_or_default();
    let target = site_detail.translation_target.clone().unwrap_or_default();
    let rpc_switch = site_detail.translation_rpc_switch;

    let domain = workflow.domain_info.as_ref().map(|info| info.domain_name.clone()).unwrap_or_default();
    let parent_sku = workflow
        .domain_info
        .as_ref()
        .and_then(|info| info.parent_identifier.clone())
        .unwrap_or_default();
    let job_id = workflow.job_params.job_id.clone();

    let built = build_translation_cache(skus_store, &domain, &parent_sku, TRANSLATION_OBJ_NAME, &translate_keys)
        .await
        .map_err(|err| CrawlError::new(CrawlErrorCode::Other("TRANSLATE_RECRAWL_FETCH_ERROR"), err.to_string()))?;
    workflow.translate_cache_aux = built.aux;

    let mut cache = built.cache;
    translate_fields(
        &mut workflow.products,
        &workflow.translate_cache_aux,
        TRANSLATION_OBJ_NAME,
        &translate_keys,
        &source,
        &target,
        rpc_switch,
        &mut cache,
        rpc,
        counters,
        &job_id,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_types::{AttrMap, DomainInfo, JobParams, SiteDetail, Value};

    fn workflow_opted_in(job_type: &str) -> Workflow {
        let mut wf = Workflow::new("http://example.com/p1".into(), job_type.into(), JobParams::default(), 0);
        wf.domain_info = Some(DomainInfo {
            domain_name: "example.com".into(),
            site_detail: Some(SiteDetail {
                translate: true,
                translate_job_types: vec!["recrawl".to_string()],
                translation_fields: vec!["name".to_string()],
                translation_source: Some("tr".into()),
                translation_target: Some("en".into()),
                translation_rpc_switch: true,
                ..Default::default()
            }),
            ..Default::default()
        });
        wf
    }

    #[test]
    fn should_translate_for_job_checks_site_detail_flags() {
        let wf = workflow_opted_in("recrawl");
        assert!(should_translate_for_job(&wf));
        let mut wf2 = workflow_opted_in("realtime");
        wf2.job_type = "realtime".into();
        assert!(!should_translate_for_job(&wf2));
    }

    struct EmptySkus;
    #[async_trait::async_trait]
    impl SkusStore for EmptySkus {
        async fn fetch(&self, _domain: &str, _parent_sku: &str) -> anyhow::Result<Vec<SkuRow>> {
            Ok(vec![])
        }
    }

    struct EchoRpc;
    #[async_trait::async_trait]
    impl TranslationRpcClient for EchoRpc {
        async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String, CrawlError> {
            Ok(format!("{text}-en"))
        }
    }

    #[tokio::test]
    async fn apply_translation_requires_site_detail() {
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 0);
        let counters = productcrawl_reliability::InMemoryCounterStore::new();
        let err = apply_translation(&mut wf, &EmptySkus, &EchoRpc, &counters).await.unwrap_err();
        assert_eq!(err.code, CrawlErrorCode::NoSiteDetail);
    }

    #[tokio::test]
    async fn apply_translation_translates_products_via_rpc() {
        let mut wf = workflow_opted_in("recrawl");
        let mut product = AttrMap::new();
        product.insert("name".into(), Value::String("Orijinal".into()));
        product.insert("sku".into(), Value::String("child-1".into()));
        wf.products = vec![product];

        let counters = productcrawl_reliability::InMemoryCounterStore::new();
        apply_translation(&mut wf, &EmptySkus, &EchoRpc, &counters).await.unwrap();

        assert_eq!(wf.products[0].get("name").and_then(Value::as_str), Some("Orijinal-en"));
    }
}
