//! Orchestrates the full discovery link filter: classify, dedup, then
//! hand the survivors back to the job server as new tasks.

use crate::classify::{classify_url, ClassifiedLink};
use crate::dedup::{filter_product_links, ParentSkuLookup, PartialDomainInfoResolver};
use async_trait::async_trait;
use productcrawl_types::{AttrMap, Value, Workflow};
use productcrawl_utils::{is_sitemap_url, LinkClass};
use std::collections::HashMap;

const SITEMAP_UPLOAD_THRESHOLD: usize = 200;
const JOB_SERVER_BATCH_SIZE: usize = 25;

#[derive(Debug, Clone, Default)]
pub struct SpideringOutput {
    pub created_at: i64,
    pub site: String,
    pub job_id: String,
    pub parent_link: String,
    pub total_links: usize,
    pub category_links: usize,
    pub sitemap_links: usize,
    pub product_links: usize,
    pub product_links_filtered: usize,
    pub skipped_links: usize,
}

#[async_trait]
pub trait SpideringHistorySink: Send + Sync {
    async fn save(&self, output: &SpideringOutput) -> anyhow::Result<()>;
}

/// Loads a batch of feedback tasks directly into the job server, bypassing
/// per-URL feedback — used for very large sitemap fan-outs.
#[async_trait]
pub trait JobServerLoader: Send + Sync {
    async fn load_tasks(&self, job_id: &str, tasks: &[String]) -> anyhow::Result<()>;
}

/// Either the per-URL feedback map the caller should attach to the
/// workflow's outgoing links, or confirmation that tasks were uploaded
/// directly to the job server instead (the sitemap short-circuit).
pub enum FeedbackOutcome {
    Feedback(HashMap<String, AttrMap>),
    UploadedToJobServer,
}

#[allow(clippy::too_many_arguments)]
pub async fn filter_job_server_feedback_links(
    workflow: &Workflow,
    task: &str,
    resolver: &dyn PartialDomainInfoResolver,
    lookup: &dyn ParentSkuLookup,
    history_sink: &dyn SpideringHistorySink,
    job_loader: &dyn JobServerLoader,
) -> FeedbackOutcome {
    let wrapper_links = workflow.extraction.as_ref().map(|e| e.links.clone()).unwrap_or_default();
    let is_product_url = workflow.domain_info.as_ref().is_some_and(|d| d.is_product_url);

    if is_product_url && wrapper_links.is_empty() {
        return FeedbackOutcome::Feedback(HashMap::new());
    }

    let domain_info = workflow.domain_info.clone().unwrap_or_default();
    let site = domain_info.domain_name.clone();

    let mut grouped: HashMap<LinkClass, Vec<ClassifiedLink>> = HashMap::new();
    let mut skipped: HashMap<String, usize> = HashMap::new();

    for (url, meta) in &wrapper_links {
        let link_type = meta.get("link_type").and_then(Value::as_str);
        match classify_url(url, task, link_type, &workflow.job_params, &domain_info) {
            Ok(classified) if classified.op.starts_with("SKIP_") => {
                *skipped.entry(classified.op).or_insert(0) += 1;
            }
            Ok(classified) => grouped.entry(classified.class).or_default().push(classified),
            Err(err) => tracing::warn!(%err, "BAD_URL_EXTRACTED"),
        }
    }

    let total_product_links = grouped.get(&LinkClass::Product).map(Vec::len).unwrap_or(0);
    let is_testwrapper = workflow.job_type == "testwrapper";

    if !is_testwrapper {
        if let Some(products) = grouped.remove(&LinkClass::Product) {
            let filtered = if total_product_links > 0 && !workflow.job_params.force_discover {
                filter_product_links(products, &workflow.job_type, resolver, lookup).await
            } else {
                products
            };
            grouped.insert(LinkClass::Product, filtered);
        }
    } else {
        tracing::info!("testwrapper job type, skipping jobserver feedback queueing");
        grouped.clear();
    }

    let mut feedback_links: HashMap<String, AttrMap> = HashMap::new();
    for links in grouped.values() {
        for link in links {
            let task_key = format!("{};{}", link.op, link.url);
            if let Some(meta) = wrapper_links.get(&link.url) {
                feedback_links.insert(task_key, meta.clone());
            }
        }
    }

    let category_links = grouped.get(&LinkClass::Category).map(Vec::len).unwrap_or(0);
    let sitemap_links = grouped.get(&LinkClass::Sitemap).map(Vec::len).unwrap_or(0);
    let product_links_filtered = grouped.get(&LinkClass::Product).map(Vec::len).unwrap_or(0);
    let skipped_links: usize = skipped.values().sum();

    if workflow.job_params.save_spidering_history {
        let output = SpideringOutput {
            created_at: workflow.crawl_timestamp,
            site: site.clone(),
            job_id: workflow.job_params.job_id.clone(),
            parent_link: task.to_string(),
            total_links: wrapper_links.len(),
            category_links,
            sitemap_links,
            product_links: total_product_links,
            product_links_filtered,
            skipped_links,
        };
        if let Err(err) = history_sink.save(&output).await {
            tracing::warn!(%err, "SPIDERING_DATA_SAVE_FAILED");
        }
    }

    if !is_testwrapper && is_sitemap_url(task) && feedback_links.len() > SITEMAP_UPLOAD_THRESHOLD {
        tracing::info!(job_id = %workflow.job_params.job_id, site = %site, count = feedback_links.len(), "loading tasks to jobserver directly");
        let tasks: Vec<String> = feedback_links.keys().cloned().collect();
        let job_id = workflow.job_params.job_id.clone();
        for chunk in tasks.chunks(JOB_SERVER_BATCH_SIZE) {
            if let Err(err) = job_loader.load_tasks(&job_id, chunk).await {
                tracing::warn!(%err, "JOBSERVER_LOAD_FAILED");
            }
        }
        return FeedbackOutcome::UploadedToJobServer;
    }

    FeedbackOutcome::Feedback(feedback_links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::{ParentSkuStatus, PartialDomainInfo};
    use productcrawl_types::{DomainInfo, ExtractionResponse, JobParams, SiteDetail};

    struct NoopResolver;
    #[async_trait]
    impl PartialDomainInfoResolver for NoopResolver {
        async fn resolve(&self, url: &str, _job_type: &str) -> anyhow::Result<PartialDomainInfo> {
            Ok(PartialDomainInfo { domain_name: "example.com".into(), parent_identifier: url.to_string() })
        }
    }

    struct NoopLookup;
    #[async_trait]
    impl ParentSkuLookup for NoopLookup {
        async fn check_batch(&self, _site: &str, _ids: &[String]) -> anyhow::Result<HashMap<String, ParentSkuStatus>> {
            Ok(HashMap::new())
        }
    }

    struct NoopHistory;
    #[async_trait]
    impl SpideringHistorySink for NoopHistory {
        async fn save(&self, _output: &SpideringOutput) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct NoopLoader;
    #[async_trait]
    impl JobServerLoader for NoopLoader {
        async fn load_tasks(&self, _job_id: &str, _tasks: &[String]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn workflow_with_links(links: Vec<(&str, Option<&str>)>) -> Workflow {
        let mut wf = Workflow::new("http://example.com/cat".into(), "recrawl".into(), JobParams::default(), 1000);
        wf.domain_info = Some(DomainInfo {
            domain_name: "example.com".into(),
            site_detail: Some(SiteDetail { url_filter: Some(r"/product/\d+".into()), ..Default::default() }),
            ..Default::default()
        });
        let mut extraction_links = HashMap::new();
        for (url, link_type) in links {
            let mut meta = AttrMap::new();
            if let Some(lt) = link_type {
                meta.insert("link_type".into(), Value::String(lt.to_string()));
            }
            extraction_links.insert(url.to_string(), meta);
        }
        wf.extraction = Some(ExtractionResponse { links: extraction_links, ..Default::default() });
        wf
    }

    #[tokio::test]
    async fn groups_and_tags_feedback_links_by_class() {
        let wf = workflow_with_links(vec![("http://example.com/product/1", None), ("http://example.com/category/shoes", None)]);
        let outcome = filter_job_server_feedback_links(&wf, "http://example.com/cat", &NoopResolver, &NoopLookup, &NoopHistory, &NoopLoader).await;
        let FeedbackOutcome::Feedback(links) = outcome else { panic!("expected feedback map") };
        assert!(links.contains_key("crawl;http://example.com/product/1"));
        assert!(links.contains_key("crawl;http://example.com/category/shoes"));
    }

    #[tokio::test]
    async fn testwrapper_job_type_skips_queueing_entirely() {
        let mut wf = workflow_with_links(vec![("http://example.com/product/1", None)]);
        wf.job_type = "testwrapper".into();
        let outcome = filter_job_server_feedback_links(&wf, "http://example.com/cat", &NoopResolver, &NoopLookup, &NoopHistory, &NoopLoader).await;
        let FeedbackOutcome::Feedback(links) = outcome else { panic!("expected feedback map") };
        assert!(links.is_empty());
    }

    #[tokio::test]
    async fn product_page_with_no_links_exits_early() {
        let mut wf = workflow_with_links(vec![]);
        wf.domain_info.as_mut().unwrap().is_product_url = true;
        let outcome = filter_job_server_feedback_links(&wf, "http://example.com/p1", &NoopResolver, &NoopLookup, &NoopHistory, &NoopLoader).await;
        let FeedbackOutcome::Feedback(links) = outcome else { panic!("expected feedback map") };
        assert!(links.is_empty());
    }
}
