//! KV-store ("rdstore") update request builder and writer dispatch.

use async_trait::async_trait;
use productcrawl_types::{JobParams, KvRecord, RdstoreUpdateRequest, SiteDetail, Value, VariationRecord, Workflow};

#[async_trait]
pub trait RdstoreWriter: Send + Sync {
    async fn update(&self, request: &RdstoreUpdateRequest) -> anyhow::Result<()>;

    async fn mark_discontinued(&self, site: &str, parent_identifier: &str) -> anyhow::Result<()>;
}

/// Site-wide `SKUS_ONLY` flag, a per-variation `skus_only` flag already
/// recorded in the KV record, or a job-parameter override — first one that's
/// true wins.
pub fn determine_skus_only(site_detail: Option<&SiteDetail>, kv_record: Option<&KvRecord>, job_params: &JobParams) -> bool {
    if site_detail.map(|sd| sd.skus_only_default).unwrap_or(false) {
        return true;
    }
    if kv_record.map(|kv| kv.variations.iter().any(|v| v.skus_only)).unwrap_or(false) {
        return true;
    }
    job_params.skus_only.unwrap_or(false)
}

/// Builds the update request for the crawled (old) variations: crumb and
/// never-canonicalized URL are taken from the first variation that carries
/// them, `force_discover` is true iff any new variation was found this
/// crawl.
pub fn build_rdstore_update_request(workflow: &Workflow, old_variations: &[productcrawl_types::AttrMap], force_discover: bool) -> RdstoreUpdateRequest {
    let site = workflow.domain_info.as_ref().map(|d| d.domain_name.clone()).unwrap_or_default();
    let parent_identifier = workflow.domain_info.as_ref().and_then(|d| d.parent_identifier.clone()).unwrap_or_default();

    let mut crumb = None;
    let mut never_canonicalized_url = None;
    let mut variations = Vec::with_capacity(old_variations.len());

    for variation in old_variations {
        if crumb.is_none() {
            if let Some(c) = variation.get("crumb").and_then(Value::as_str) {
                if c.len() >= 3 {
                    crumb = Some(c.to_string());
                }
            }
        }
        if never_canonicalized_url.is_none() {
            if let Some(ncu) = variation.get("_reserved_init_url").and_then(Value::as_str) {
                if ncu.starts_with("http") {
                    never_canonicalized_url = Some(ncu.to_string());
                }
            }
        }

        let Some(child_identifier) = variation.get("_id").and_then(Value::as_str) else { continue };
        let is_active = variation.get("is_active").and_then(Value::as_int).map(|n| n >= 0).unwrap_or(false);
        let offers_count = variation.get("offers").and_then(Value::as_list).map(|l| l.len() as i32).unwrap_or(0);
        variations.push(VariationRecord {
            child_identifier: child_identifier.to_string(),
            last_crawl_time: Some(workflow.crawl_timestamp),
            offers_count,
            is_active,
            skus_only: false,
        });
    }

    RdstoreUpdateRequest { site, parent_identifier, crumb, never_canonicalized_url, force_discover, variations }
}

/// On a successful fetch, push the update request; on a permanent failure,
/// mark the product discontinued instead. Transient statuses write nothing
/// at all, skipping data transformations entirely.
pub async fn write_rdstore(writer: &dyn RdstoreWriter, web_status: i32, request: &RdstoreUpdateRequest) -> anyhow::Result<()> {
    if (200..300).contains(&web_status) {
        writer.update(request).await
    } else if (400..500).contains(&web_status) {
        writer.mark_discontinued(&request.site, &request.parent_identifier).await
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_types::AttrMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWriter {
        updated: Mutex<Vec<String>>,
        discontinued: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RdstoreWriter for RecordingWriter {
        async fn update(&self, request: &RdstoreUpdateRequest) -> anyhow::Result<()> {
            self.updated.lock().unwrap().push(request.parent_identifier.clone());
            Ok(())
        }
        async fn mark_discontinued(&self, _site: &str, parent_identifier: &str) -> anyhow::Result<()> {
            self.discontinued.lock().unwrap().push(parent_identifier.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn success_status_writes_update_permanent_failure_discontinues() {
        let writer = RecordingWriter::default();
        let req = RdstoreUpdateRequest { parent_identifier: "p1".into(), ..Default::default() };
        write_rdstore(&writer, 200, &req).await.unwrap();
        write_rdstore(&writer, 404, &req).await.unwrap();
        write_rdstore(&writer, 503, &req).await.unwrap();
        assert_eq!(writer.updated.lock().unwrap().len(), 1);
        assert_eq!(writer.discontinued.lock().unwrap().len(), 1);
    }

    #[test]
    fn crumb_under_three_chars_is_ignored() {
        let mut variation = AttrMap::new();
        variation.insert("_id".into(), Value::String("c1".into()));
        variation.insert("crumb".into(), Value::String("ab".into()));
        let wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 1_000);
        let req = build_rdstore_update_request(&wf, std::slice::from_ref(&variation), false);
        assert!(req.crumb.is_none());
    }
}
