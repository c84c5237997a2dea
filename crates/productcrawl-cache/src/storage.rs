//! Cache storage backends. `InMemoryCacheStorage` backs tests and single-
//! process runs; `HttpCacheStorage` talks to the cache service addressed by
//! `CACHE_SERVICE_ADDR` with a download/upload pair of HTTP calls.

use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> anyhow::Result<()>;
}

/// In-memory cache keyed by cache id, each entry carrying its own expiry
/// instant so reads past TTL behave like a miss without a background sweep.
#[derive(Default)]
pub struct InMemoryCacheStorage {
    entries: DashMap<String, (Vec<u8>, Instant)>,
}

impl InMemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for InMemoryCacheStorage {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        match self.entries.get(key) {
            Some(entry) if entry.1 > Instant::now() => Ok(Some(entry.0.clone())),
            Some(_) => {
                self.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }
}

/// Cache service client: download is a GET keyed by cache id, upload is a
/// POST of the compressed document.
pub struct HttpCacheStorage {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCacheStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl CacheStorage for HttpCacheStorage {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let url = format!("{}/crawl/download/content", self.base_url);
        let resp = self.client.get(&url).query(&[("key", key)]).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status()?;
        Ok(Some(resp.bytes().await?.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> anyhow::Result<()> {
        let url = format!("{}/crawl/upload/content", self.base_url);
        self.client
            .post(&url)
            .query(&[("key", key), ("expiry", &ttl.as_secs().to_string())])
            .body(value)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_storage_round_trips() {
        let storage = InMemoryCacheStorage::new();
        storage.put("k", b"hello".to_vec(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_miss() {
        let storage = InMemoryCacheStorage::new();
        storage.put("k", b"hello".to_vec(), Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(storage.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_key_reads_as_miss() {
        let storage = InMemoryCacheStorage::new();
        assert_eq!(storage.get("nope").await.unwrap(), None);
    }
}
