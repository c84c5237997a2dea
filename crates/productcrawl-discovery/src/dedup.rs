//! Step 3 of the link filter: batched KV-store dedup of product links.

use crate::classify::ClassifiedLink;
use async_trait::async_trait;
use std::collections::HashMap;

const BATCH_SIZE: usize = 25;

/// Resolves a bare URL to the (site, parent identifier) pair the KV store
/// keys its records on.
#[async_trait]
pub trait PartialDomainInfoResolver: Send + Sync {
    async fn resolve(&self, url: &str, job_type: &str) -> anyhow::Result<PartialDomainInfo>;
}

#[derive(Debug, Clone)]
pub struct PartialDomainInfo {
    pub domain_name: String,
    pub parent_identifier: String,
}

/// Batched dedup lookup against the KV store.
#[async_trait]
pub trait ParentSkuLookup: Send + Sync {
    async fn check_batch(&self, site: &str, parent_identifiers: &[String]) -> anyhow::Result<HashMap<String, ParentSkuStatus>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParentSkuStatus {
    pub discontinued: bool,
    pub discoverable: bool,
}

/// Keeps a product link if the store reports it discontinued-and-rediscovered,
/// genuinely new (`discoverable`), or missing from the store entirely; drops
/// it only when the store has an active, already-known record.
pub async fn filter_product_links(links: Vec<ClassifiedLink>, job_type: &str, resolver: &dyn PartialDomainInfoResolver, lookup: &dyn ParentSkuLookup) -> Vec<ClassifiedLink> {
    let mut filtered = Vec::new();
    let mut new_count = 0usize;
    let mut rediscovered_count = 0usize;
    let mut failed = Vec::new();

    for chunk in links.chunks(BATCH_SIZE) {
        let mut resolved = Vec::with_capacity(chunk.len());
        for link in chunk {
            match resolver.resolve(&link.url, job_type).await {
                Ok(info) => resolved.push((info.domain_name, info.parent_identifier, link.clone())),
                Err(err) => {
                    tracing::warn!(url = %link.url, %err, "partial domain info resolution failed");
                    failed.push(link.url.clone());
                }
            }
        }
        if resolved.is_empty() {
            continue;
        }

        let site = resolved[0].0.clone();
        let parent_identifiers: Vec<String> = resolved.iter().map(|(_, parent_sku, _)| parent_sku.clone()).collect();

        match lookup.check_batch(&site, &parent_identifiers).await {
            Ok(statuses) => {
                for (_, parent_sku, link) in &resolved {
                    match statuses.get(parent_sku) {
                        Some(status) if status.discontinued => {
                            rediscovered_count += 1;
                            filtered.push(link.clone());
                        }
                        Some(status) if status.discoverable => {
                            new_count += 1;
                            filtered.push(link.clone());
                        }
                        Some(_) => {}
                        None => {
                            new_count += 1;
                            filtered.push(link.clone());
                        }
                    }
                }
            }
            Err(err) => tracing::warn!(%err, "RDSTORE_BULK_LOOKUP_FAILED"),
        }
    }

    if !failed.is_empty() {
        tracing::warn!(count = failed.len(), "RDSTORE_BULK_LOOKUP_FAILED_COUNT");
    }
    tracing::info!(new_count, rediscovered_count, "RDSTORE_BULK_LOOKUP_COMPLETED");
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_utils::LinkClass;

    struct StubResolver;
    #[async_trait]
    impl PartialDomainInfoResolver for StubResolver {
        async fn resolve(&self, url: &str, _job_type: &str) -> anyhow::Result<PartialDomainInfo> {
            Ok(PartialDomainInfo { domain_name: "example.com".into(), parent_identifier: url.to_string() })
        }
    }

    struct StubLookup {
        statuses: HashMap<String, ParentSkuStatus>,
    }
    #[async_trait]
    impl ParentSkuLookup for StubLookup {
        async fn check_batch(&self, _site: &str, parent_identifiers: &[String]) -> anyhow::Result<HashMap<String, ParentSkuStatus>> {
            Ok(parent_identifiers.iter().filter_map(|id| self.statuses.get(id).map(|s| (id.clone(), *s))).collect())
        }
    }

    fn link(url: &str) -> ClassifiedLink {
        ClassifiedLink { url: url.to_string(), class: LinkClass::Product, op: "crawl".to_string() }
    }

    #[tokio::test]
    async fn keeps_unknown_and_discontinued_drops_known_active() {
        let links = vec![link("http://example.com/p1"), link("http://example.com/p2"), link("http://example.com/p3")];
        let mut statuses = HashMap::new();
        statuses.insert("http://example.com/p2".to_string(), ParentSkuStatus { discontinued: false, discoverable: false });
        statuses.insert("http://example.com/p3".to_string(), ParentSkuStatus { discontinued: true, discoverable: false });

        let filtered = filter_product_links(links, "recrawl", &StubResolver, &StubLookup { statuses }).await;
        let urls: Vec<&str> = filtered.iter().map(|l| l.url.as_str()).collect();
        assert!(urls.contains(&"http://example.com/p1"));
        assert!(!urls.contains(&"http://example.com/p2"));
        assert!(urls.contains(&"http://example.com/p3"));
    }
}
