//! # productcrawl-cache
//!
//! Write-through cache for fetched pages: a pluggable
//! `CacheStorage` backend, cache-key construction re-exported from
//! `productcrawl-utils`, and the TTL-aware read/write helpers the fetch loop
//! calls before and after a network request.

pub mod key;
pub mod storage;

pub use key::{construct_cache_id, effective_ttl_secs, CacheKeyConfig, DEFAULT_FOLDER, DEFAULT_TTL_SECS, UNSUPERVISED_FOLDER};
pub use storage::{CacheStorage, HttpCacheStorage, InMemoryCacheStorage};

use productcrawl_types::WebResponse;
use serde::{Deserialize, Serialize};

/// What's actually stored under a cache key: the response plus the unix
/// timestamp it was written at, so a later read can judge staleness.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedEntry {
    response: WebResponse,
    written_at: i64,
}

/// Reads `cache_key` from `storage` and returns the cached response if
/// present and within `ttl_secs` of `now` (`None` disables the check
/// entirely). A decode failure is treated as a miss.
pub async fn read_cached_response(
    storage: &dyn CacheStorage,
    cache_key: &str,
    ttl_secs: Option<i64>,
    now: i64,
) -> anyhow::Result<Option<WebResponse>> {
    let Some(bytes) = storage.get(cache_key).await? else {
        return Ok(None);
    };
    let entry: CachedEntry = match serde_json::from_slice(&bytes) {
        Ok(entry) => entry,
        Err(err) => {
            tracing::warn!(cache_key, %err, "CACHE_READ_JSON_DECODE_ERROR");
            return Ok(None);
        }
    };

    if let Some(ttl) = ttl_secs {
        let age = now - entry.written_at;
        if age >= ttl {
            tracing::info!(cache_key, age, ttl, "CACHE_READ_TTL_EXCEEDED_ERROR");
            return Ok(None);
        }
    }

    Ok(Some(entry.response))
}

/// Writes `response` to `storage` under `cache_key`, stamped with `now` for
/// later TTL checks. `ttl_secs` of `None` stores with a one-day backstop
/// expiry on the storage entry itself so it doesn't live forever.
pub async fn write_cached_response(
    storage: &dyn CacheStorage,
    cache_key: &str,
    response: &WebResponse,
    ttl_secs: Option<i64>,
    now: i64,
) -> anyhow::Result<()> {
    let entry = CachedEntry { response: response.clone(), written_at: now };
    let bytes = serde_json::to_vec(&entry)?;
    let storage_ttl = std::time::Duration::from_secs(ttl_secs.unwrap_or(24 * 60 * 60).max(1) as u64);
    storage.put(cache_key, bytes, storage_ttl).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> WebResponse {
        WebResponse { status: 200, success: true, content: "<html></html>".into(), ..Default::default() }
    }

    #[tokio::test]
    async fn write_then_read_round_trips_within_ttl() {
        let storage = InMemoryCacheStorage::new();
        write_cached_response(&storage, "ce/recrawl/example_com/abc", &sample_response(), Some(3600), 1_000)
            .await
            .unwrap();
        let got = read_cached_response(&storage, "ce/recrawl/example_com/abc", Some(3600), 1_500).await.unwrap();
        assert!(got.is_some());
        assert_eq!(got.unwrap().content, "<html></html>");
    }

    #[tokio::test]
    async fn read_past_ttl_is_a_miss() {
        let storage = InMemoryCacheStorage::new();
        write_cached_response(&storage, "k", &sample_response(), Some(60), 1_000).await.unwrap();
        let got = read_cached_response(&storage, "k", Some(60), 1_200).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn none_ttl_disables_staleness_check() {
        let storage = InMemoryCacheStorage::new();
        write_cached_response(&storage, "k", &sample_response(), None, 1_000).await.unwrap();
        let got = read_cached_response(&storage, "k", None, 10_000_000).await.unwrap();
        assert!(got.is_some());
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let storage = InMemoryCacheStorage::new();
        let got = read_cached_response(&storage, "nope", Some(3600), 1_000).await.unwrap();
        assert!(got.is_none());
    }
}
