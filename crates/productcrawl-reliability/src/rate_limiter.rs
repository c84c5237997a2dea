//! Per-source per-second token check: `INCR` the current
//! second's bucket, set a short expiry on first touch, and refuse once the
//! incremented value exceeds the configured limit.

use crate::counter_store::CounterStore;
use std::time::{SystemTime, UNIX_EPOCH};

const BUCKET_TTL_SECS: u64 = 10;

fn unix_second() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_secs() as i64
}

/// `CheckRateLimitPerSecond`: true iff this increment keeps the source under
/// its configured per-second limit. `source` must be non-empty.
pub async fn check_rate_limit_per_second(
    store: &dyn CounterStore,
    source: &str,
) -> anyhow::Result<bool> {
    if source.is_empty() {
        anyhow::bail!("source not provided");
    }

    let limit_key = format!("global_ratelimit_per_second_{source}");
    let limit = store.get_i64(&limit_key).await?.unwrap_or(i64::MAX);

    let bucket_key = format!("ratelimit_per_second_{source}_{}", unix_second());
    let requests_made = store.incr_with_expiry(&bucket_key, BUCKET_TTL_SECS).await?;

    Ok(requests_made <= limit)
}

/// Milliseconds remaining until the next whole second boundary, used by the
/// actor to sleep before retrying a refused batch.
pub fn millis_until_next_second() -> u64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch");
    let millis_into_second = now.subsec_millis() as u64;
    1000 - millis_into_second
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter_store::InMemoryCounterStore;

    #[tokio::test]
    async fn allows_requests_under_the_limit() {
        let store = InMemoryCounterStore::new();
        store.set("global_ratelimit_per_second_amazon", 2).await;
        assert!(check_rate_limit_per_second(&store, "amazon").await.unwrap());
        assert!(check_rate_limit_per_second(&store, "amazon").await.unwrap());
        assert!(!check_rate_limit_per_second(&store, "amazon").await.unwrap());
    }

    #[tokio::test]
    async fn rejects_empty_source() {
        let store = InMemoryCounterStore::new();
        assert!(check_rate_limit_per_second(&store, "").await.is_err());
    }
}
