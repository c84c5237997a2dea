//! Discovery's document-store bulk write: products and categories are
//! upserted into a per-site database under a
//! collection keyed by job and crawl time.

use async_trait::async_trait;
use productcrawl_types::{AttrMap, Value};

#[async_trait]
pub trait DocumentStoreWriter: Send + Sync {
    async fn upsert(&self, database: &str, collection: &str, id: &str, document: &AttrMap) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryWriteCounts {
    pub products: usize,
    pub categories: usize,
}

/// `database = crawl_<site>`, `collection = <job_id>_<time_created_sec>_<kind>`.
pub async fn bulk_write_discovery(
    writer: &dyn DocumentStoreWriter,
    site: &str,
    job_id: &str,
    time_created_sec: i64,
    products: &[AttrMap],
    categories: &[AttrMap],
) -> anyhow::Result<DiscoveryWriteCounts> {
    let database = format!("crawl_{site}");
    let mut counts = DiscoveryWriteCounts::default();

    let products_collection = format!("{job_id}_{time_created_sec}_products");
    for doc in products {
        if let Some(id) = doc.get("_id").and_then(Value::as_str) {
            writer.upsert(&database, &products_collection, id, doc).await?;
            counts.products += 1;
        } else {
            tracing::warn!("DISCOVERY_STORE_SKIP_MISSING_ID");
        }
    }

    let categories_collection = format!("{job_id}_{time_created_sec}_categories");
    for doc in categories {
        if let Some(id) = doc.get("_id").and_then(Value::as_str) {
            writer.upsert(&database, &categories_collection, id, doc).await?;
            counts.categories += 1;
        } else {
            tracing::warn!("DISCOVERY_STORE_SKIP_MISSING_ID");
        }
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        writes: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl DocumentStoreWriter for RecordingStore {
        async fn upsert(&self, database: &str, collection: &str, id: &str, _document: &AttrMap) -> anyhow::Result<()> {
            self.writes.lock().unwrap().push((database.to_string(), collection.to_string(), id.to_string()));
            Ok(())
        }
    }

    fn doc(id: &str) -> AttrMap {
        let mut m = AttrMap::new();
        m.insert("_id".into(), Value::String(id.to_string()));
        m
    }

    #[tokio::test]
    async fn writes_products_and_categories_under_distinct_collections() {
        let store = RecordingStore::default();
        let counts = bulk_write_discovery(&store, "example.com", "job1", 1_700_000_000, &[doc("p1")], &[doc("c1")]).await.unwrap();
        assert_eq!(counts, DiscoveryWriteCounts { products: 1, categories: 1 });
        let writes = store.writes.lock().unwrap();
        assert!(writes.contains(&("crawl_example.com".into(), "job1_1700000000_products".into(), "p1".into())));
        assert!(writes.contains(&("crawl_example.com".into(), "job1_1700000000_categories".into(), "c1".into())));
    }
}
