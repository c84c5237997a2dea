//! The fetch loop: cache-first read, attempt-bounded retry
//! against the proxy service, then a cache write-through on success. Uses
//! the injected `CacheStorage` and `RetryPolicy` rather than a fixed
//! attempt count.

use crate::proxy_client::ProxyClient;
use crate::request::RequestPayload;
use productcrawl_cache::{read_cached_response, write_cached_response, CacheStorage};
use productcrawl_reliability::{retry_with_backoff, RetryPolicy};
use productcrawl_types::WebResponse;
use std::time::Duration;
use tracing::info;

/// How often to log that a proxy call is still outstanding.
const LIVENESS_TICK: Duration = Duration::from_secs(10);

/// Races `proxy.fetch` against a liveness ticker so a slow call shows up in
/// logs while it's still in flight instead of going silent until it
/// resolves or times out.
async fn fetch_with_liveness(proxy: &ProxyClient, payload: &RequestPayload, attempt: u32) -> WebResponse {
    let mut ticker = tokio::time::interval(LIVENESS_TICK);
    ticker.tick().await; // first tick fires immediately, discard it
    let mut ticks = 0u32;
    tokio::pin! {
        let fetch = proxy.fetch(payload);
    }
    loop {
        tokio::select! {
            response = &mut fetch => return response,
            _ = ticker.tick() => {
                ticks += 1;
                info!(url = %payload.url, attempt, waited_secs = ticks * LIVENESS_TICK.as_secs() as u32, "PCREQUEST_STILL_WAITING");
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FetchLoopConfig {
    pub retry: RetryPolicy,
    pub read_from_cache: bool,
    pub write_to_cache: bool,
    pub ttl_secs: Option<i64>,
}

impl Default for FetchLoopConfig {
    fn default() -> Self {
        Self { retry: RetryPolicy::default(), read_from_cache: true, write_to_cache: true, ttl_secs: Some(productcrawl_cache::DEFAULT_TTL_SECS) }
    }
}

/// Fetches one page: a cache hit short-circuits the network call entirely;
/// a miss retries the proxy-service call per `config.retry`, classifying
/// 5xx/0 responses as transient, then writes a successful fetch back to
/// cache. `now` is the caller-supplied unix timestamp (kept out of this
/// crate so callers can stamp it once per workflow).
pub async fn fetch_page(
    proxy: &ProxyClient,
    cache: &dyn CacheStorage,
    cache_key: &str,
    payload: &RequestPayload,
    config: FetchLoopConfig,
    now: i64,
) -> WebResponse {
    if config.read_from_cache {
        if let Ok(Some(cached)) = read_cached_response(cache, cache_key, config.ttl_secs, now).await {
            info!(url = %payload.url, cache_key, "CRAWL_CACHEHIT");
            return WebResponse { success: true, ..cached };
        }
        info!(url = %payload.url, cache_key, "CRAWL_CACHEMISS");
    }

    // `op` returns `Err` only for a transient response, so `retry_with_backoff`
    // retries exactly the cases the fetch loop should retry; a permanent
    // error or success is `Ok` and returned immediately.
    let result: Result<WebResponse, WebResponse> = retry_with_backoff(
        config.retry,
        |attempt| async move {
            let resp = fetch_with_liveness(proxy, payload, attempt).await;
            if resp.is_transient_status() {
                Err(resp)
            } else {
                Ok(resp)
            }
        },
        |_resp: &WebResponse| true,
    )
    .await;

    let response = match result {
        Ok(resp) => resp,
        Err(resp) => resp,
    };

    if config.write_to_cache && response.is_success_status() {
        let _ = write_cached_response(cache, cache_key, &response, config.ttl_secs, now).await;
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_cache::InMemoryCacheStorage;
    use std::collections::HashMap;

    fn sample_payload() -> RequestPayload {
        RequestPayload { url: "http://example.com/p1".into(), domain: "example.com".into(), ..Default::default() }
    }

    #[tokio::test]
    async fn cache_hit_skips_the_network_call() {
        let storage = InMemoryCacheStorage::new();
        let cached = WebResponse { status: 200, content: "cached".into(), ..Default::default() };
        write_cached_response(&storage, "k", &cached, Some(3600), 1_000).await.unwrap();

        // No real proxy router is reachable in a test; use a bogus address
        // and rely on the cache hit to short-circuit before any connection
        // is attempted.
        let proxy = ProxyClient::new("127.0.0.1:1");
        let config = FetchLoopConfig { retry: RetryPolicy::new(1, std::time::Duration::from_millis(1), std::time::Duration::from_millis(1)), ..Default::default() };
        let response = fetch_page(&proxy, &storage, "k", &sample_payload(), config, 1_100).await;
        assert_eq!(response.content, "cached");
        assert!(response.success);
    }

    #[test]
    fn default_config_reads_and_writes_cache_with_one_hour_ttl() {
        let config = FetchLoopConfig::default();
        assert!(config.read_from_cache);
        assert!(config.write_to_cache);
        assert_eq!(config.ttl_secs, Some(3600));
    }

    #[test]
    fn headers_field_defaults_to_empty_map() {
        let payload = sample_payload();
        assert_eq!(payload.headers, HashMap::new());
    }
}
