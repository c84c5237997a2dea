//! Consolidated Redis-backed store. Collapses the KV cache, discovery
//! document store, SKUs table and related lookups onto one Redis
//! connection: a multiplexed connection cloned cheaply per call,
//! `AsyncCommands` for the CRUD shapes, raw `redis::cmd` where it isn't.
//! The consolidation is recorded in DESIGN.md.

use async_trait::async_trait;
use productcrawl_discovery::{ParentSkuLookup, ParentSkuStatus, SpideringHistorySink, SpideringOutput};
use productcrawl_pipeline::{DataSourceMapStore, KvStoreReader};
use productcrawl_reliability::CounterStore;
use productcrawl_sideeffects::DocumentStoreWriter;
use productcrawl_translate::{SkuRow, SkusStore};
use productcrawl_types::{AttrMap, KvRecord};
use redis::AsyncCommands;
use std::collections::HashMap;

#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(redis_addr: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(format!("redis://{redis_addr}"))?;
        Ok(Self { client })
    }

    async fn conn(&self) -> anyhow::Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_tokio_connection().await?)
    }
}

#[async_trait]
impl KvStoreReader for RedisStore {
    async fn fetch(&self, site: &str, parent_identifier: &str) -> anyhow::Result<Option<KvRecord>> {
        let mut conn = self.conn().await?;
        let key = format!("rdstore:{site}:{parent_identifier}");
        let raw: Option<String> = conn.get(&key).await?;
        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }
}

#[async_trait]
impl DataSourceMapStore for RedisStore {
    async fn get(&self, hash_key: &str, field: &str) -> anyhow::Result<Option<Vec<String>>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.hget(hash_key, field).await?;
        Ok(raw.map(|s| serde_json::from_str(&s)).transpose()?)
    }
}

#[async_trait]
impl ParentSkuLookup for RedisStore {
    async fn check_batch(&self, site: &str, parent_identifiers: &[String]) -> anyhow::Result<HashMap<String, ParentSkuStatus>> {
        if parent_identifiers.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.conn().await?;
        let hash_key = format!("parent_sku_status:{site}");
        let raw: Vec<Option<String>> = conn.hget(&hash_key, parent_identifiers).await?;
        let mut out = HashMap::with_capacity(parent_identifiers.len());
        for (id, value) in parent_identifiers.iter().zip(raw) {
            if let Some(value) = value {
                if let Ok(json) = serde_json::from_str::<serde_json::Value>(&value) {
                    let status = ParentSkuStatus {
                        discontinued: json.get("discontinued").and_then(|v| v.as_bool()).unwrap_or(false),
                        discoverable: json.get("discoverable").and_then(|v| v.as_bool()).unwrap_or(false),
                    };
                    out.insert(id.clone(), status);
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn get_i64(&self, key: &str) -> anyhow::Result<Option<i64>> {
        let mut conn = self.conn().await?;
        Ok(conn.get(key).await?)
    }

    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> anyhow::Result<i64> {
        let mut conn = self.conn().await?;
        let value: i64 = conn.incr(key, 1).await?;
        let _: () = conn.expire(key, ttl_secs as i64).await?;
        Ok(value)
    }

    async fn hincrby(&self, hash_key: &str, field: &str, amount: i64) -> anyhow::Result<i64> {
        let mut conn = self.conn().await?;
        Ok(conn.hincr(hash_key, field, amount).await?)
    }
}

#[async_trait]
impl SpideringHistorySink for RedisStore {
    async fn save(&self, output: &SpideringOutput) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        let key = format!("spidering_history:{}:{}", output.site, output.job_id);
        let body = serde_json::to_string(&serde_json::json!({
            "created_at": output.created_at,
            "site": output.site,
            "job_id": output.job_id,
            "parent_link": output.parent_link,
            "total_links": output.total_links,
            "category_links": output.category_links,
            "sitemap_links": output.sitemap_links,
            "product_links": output.product_links,
            "product_links_filtered": output.product_links_filtered,
            "skipped_links": output.skipped_links,
        }))?;
        let _: () = conn.lpush(&key, body).await?;
        let _: () = conn.ltrim(&key, 0, 999).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStoreWriter for RedisStore {
    async fn upsert(&self, database: &str, collection: &str, id: &str, document: &AttrMap) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        let key = format!("doc:{database}:{collection}:{id}");
        let body = serde_json::to_string(document)?;
        let _: () = conn.set(&key, body).await?;
        Ok(())
    }
}

#[async_trait]
impl SkusStore for RedisStore {
    async fn fetch(&self, domain: &str, parent_sku: &str) -> anyhow::Result<Vec<SkuRow>> {
        let mut conn = self.conn().await?;
        let key = format!("skus:{domain}:{parent_sku}");
        let raw: Option<String> = conn.get(&key).await?;
        let Some(raw) = raw else { return Ok(Vec::new()) };
        let rows: Vec<serde_json::Value> = serde_json::from_str(&raw)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let sku = row.get("sku")?.as_str()?.to_string();
                let data: AttrMap = serde_json::from_value(row.get("data")?.clone()).ok()?;
                Some(SkuRow { sku, data })
            })
            .collect())
    }
}
