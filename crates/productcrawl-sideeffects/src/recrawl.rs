//! Recrawl post-crawl orchestration: split variations, update
//! the KV store, and publish ETL messages.

use crate::rdstore::{build_rdstore_update_request, determine_skus_only, write_rdstore, RdstoreWriter};
use crate::variations::get_new_old_variations;
use productcrawl_events::{build_msg_id, publish_msgs_to_etl, EtlPublishCounts, Publisher, RawEtlMessage};
use productcrawl_types::{AttrMap, CrawlError, CrawlErrorCode, Value, Workflow};

pub async fn run_recrawl_side_effects(
    workflow: &mut Workflow,
    rdstore_writer: &dyn RdstoreWriter,
    raw_publisher: &dyn Publisher,
    pp_publisher: &dyn Publisher,
) -> Result<EtlPublishCounts, CrawlError> {
    if workflow.web_response.as_ref().map(|r| r.is_transient_status()).unwrap_or(false) {
        return Ok(EtlPublishCounts::default());
    }

    let kv_record = workflow.kv_record.clone();
    if kv_record.as_ref().map(|r| r.parent_identifier.is_empty()).unwrap_or(true) {
        return Err(CrawlError::new(CrawlErrorCode::RdstoreDataMissing, "RDSTORE_DATA_MISSING for recrawl"));
    }

    let (new_variations, old_variations) = get_new_old_variations(workflow);
    workflow.products = old_variations.clone();

    let site_detail = workflow.domain_info.as_ref().and_then(|d| d.site_detail.as_ref());
    let skus_only = determine_skus_only(site_detail, kv_record.as_ref(), &workflow.job_params);
    let force_discover = !new_variations.is_empty();

    let request = build_rdstore_update_request(workflow, &old_variations, force_discover);
    let web_status = workflow.web_response.as_ref().map(|r| r.status).unwrap_or(0);
    write_rdstore(rdstore_writer, web_status, &request)
        .await
        .map_err(|err| CrawlError::new(CrawlErrorCode::RdstoreWriteTimeout, err.to_string()))?;

    let msgs = build_raw_etl_messages(workflow, &old_variations, web_status, skus_only);
    publish_msgs_to_etl(raw_publisher, pp_publisher, &msgs)
        .await
        .map_err(|err| CrawlError::new(CrawlErrorCode::Other("ETL_PUBLISH_FAILED"), err.to_string()))
}

fn build_raw_etl_messages(workflow: &Workflow, variations: &[AttrMap], web_status: i32, skus_only: bool) -> Vec<RawEtlMessage> {
    let site = workflow.domain_info.as_ref().map(|d| d.domain_name.clone()).unwrap_or_default();
    let parent_identifier = workflow.domain_info.as_ref().and_then(|d| d.parent_identifier.clone()).unwrap_or_default();
    let extraction_mode = workflow.extraction_data_source.clone().unwrap_or_else(|| "WRAPPER".to_string());
    let page_discontinued = (400..500).contains(&web_status);

    variations
        .iter()
        .filter_map(|variation| {
            let child_identifier = variation.get("_id").and_then(Value::as_str)?;
            let is_active = variation.get("is_active").and_then(Value::as_int).map(|n| n == 1).unwrap_or(false);
            Some(RawEtlMessage {
                msg_id: build_msg_id(&workflow.job_params.job_id, &site, &parent_identifier),
                data: variation.clone(),
                proxy: 0,
                frequency: "RF3".to_string(),
                extraction_mode: extraction_mode.clone(),
                domain_name: site.clone(),
                is_active,
                page_discontinued,
                force_download_image: false,
                force_download_image_size: None,
                min_valid_image_size: None,
                allow_html_image_source: false,
                skus_only,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use productcrawl_events::Publisher;
    use productcrawl_types::{DomainInfo, JobParams, KvRecord, RdstoreUpdateRequest, WebResponse};
    use std::sync::Mutex;

    struct NoopRdstore;
    #[async_trait]
    impl RdstoreWriter for NoopRdstore {
        async fn update(&self, _request: &RdstoreUpdateRequest) -> anyhow::Result<()> {
            Ok(())
        }
        async fn mark_discontinued(&self, _site: &str, _parent_identifier: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingPublisher {
        count: Mutex<usize>,
    }
    #[async_trait]
    impl Publisher for CountingPublisher {
        fn queue_name(&self) -> &str {
            "q"
        }
        async fn publish(&self, _routing_key: &str, _payload: &[u8]) -> anyhow::Result<()> {
            *self.count.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn product(id: &str) -> AttrMap {
        let mut m = AttrMap::new();
        m.insert("_id".into(), Value::String(id.to_string()));
        m
    }

    #[tokio::test]
    async fn missing_kv_record_fails_early() {
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000);
        wf.web_response = Some(WebResponse { status: 200, ..Default::default() });
        let err = run_recrawl_side_effects(&mut wf, &NoopRdstore, &CountingPublisher::default(), &CountingPublisher::default()).await.unwrap_err();
        assert_eq!(err.code, CrawlErrorCode::RdstoreDataMissing);
    }

    #[tokio::test]
    async fn successful_crawl_publishes_raw_and_pp_for_non_skus_only() {
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000);
        wf.web_response = Some(WebResponse { status: 200, ..Default::default() });
        wf.kv_record = Some(KvRecord { parent_identifier: "p1".into(), ..Default::default() });
        wf.domain_info = Some(DomainInfo { domain_name: "example.com".into(), parent_identifier: Some("p1".into()), ..Default::default() });
        wf.products = vec![product("a")];
        let raw = CountingPublisher::default();
        let pp = CountingPublisher::default();
        let counts = run_recrawl_side_effects(&mut wf, &NoopRdstore, &raw, &pp).await.unwrap();
        assert_eq!(counts.raw, 1);
        assert_eq!(counts.processing_pipeline, 1);
    }
}
