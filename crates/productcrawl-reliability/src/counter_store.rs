//! The shared counter store: an injected collaborator providing atomic
//! INCR + EXPIRE and plain GET, backing both the rate limiter (§4.A) and the
//! translation stats counters (§4.E phase 3).

use async_trait::async_trait;

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Plain integer read, used for the configured per-source limit.
    async fn get_i64(&self, key: &str) -> anyhow::Result<Option<i64>>;

    /// Atomically increments `key` and returns the post-increment value; on
    /// first creation of the key, sets `ttl_secs` as its expiry.
    async fn incr_with_expiry(&self, key: &str, ttl_secs: u64) -> anyhow::Result<i64>;

    /// Increments a field within a hash (used for translation stats), no
    /// expiry semantics.
    async fn hincrby(&self, hash_key: &str, field: &str, amount: i64) -> anyhow::Result<i64>;
}

/// An in-memory `CounterStore` for tests and single-process deployments,
/// grounded in the same key shapes the real Redis-backed store uses.
#[derive(Default)]
pub struct InMemoryCounterStore {
    counters: tokio::sync::Mutex<std::collections::HashMap<String, i64>>,
    hashes: tokio::sync::Mutex<std::collections::HashMap<String, std::collections::HashMap<String, i64>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, key: &str, value: i64) {
        self.counters.lock().await.insert(key.to_string(), value);
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get_i64(&self, key: &str) -> anyhow::Result<Option<i64>> {
        Ok(self.counters.lock().await.get(key).copied())
    }

    async fn incr_with_expiry(&self, key: &str, _ttl_secs: u64) -> anyhow::Result<i64> {
        let mut counters = self.counters.lock().await;
        let entry = counters.entry(key.to_string()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn hincrby(&self, hash_key: &str, field: &str, amount: i64) -> anyhow::Result<i64> {
        let mut hashes = self.hashes.lock().await;
        let hash = hashes.entry(hash_key.to_string()).or_default();
        let entry = hash.entry(field.to_string()).or_insert(0);
        *entry += amount;
        Ok(*entry)
    }
}
