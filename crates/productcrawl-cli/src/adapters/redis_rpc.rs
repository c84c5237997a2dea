//! Generic Redis-queue RPC transport: a request/response protocol layered
//! over Redis lists rather than a dedicated broker. A caller `LPUSH`es a
//! JSON envelope carrying a correlation id onto `request_list`, then
//! `BRPOP`s a per-call reply list the worker on the other end is expected
//! to `RPUSH` a single JSON response onto. The workers on the other side of
//! these queues are out of scope here, so call sites only need the
//! request/response contract.

use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// One blocking RPC call over a Redis list pair: `redis::Client::open` once,
/// a fresh multiplexed connection per call (cheap — the connection is
/// multiplexed under the hood).
#[derive(Clone)]
pub struct RedisRpcTransport {
    client: redis::Client,
    timeout: Duration,
}

impl RedisRpcTransport {
    pub fn new(redis_addr: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(format!("redis://{redis_addr}"))?;
        Ok(Self { client, timeout })
    }

    /// Pushes `request` (serialized as JSON) onto `queue` and blocks on a
    /// private reply list until a response arrives or `self.timeout` elapses.
    pub async fn call<Req, Resp>(&self, queue: &str, request: &Req) -> anyhow::Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let mut conn = self.client.get_multiplexed_tokio_connection().await?;
        let reply_list = format!("{queue}:reply:{}", Uuid::new_v4());

        let envelope = RpcEnvelope { reply_to: reply_list.clone(), payload: request };
        let body = serde_json::to_vec(&envelope)?;
        let _: () = conn.lpush(queue, body).await?;

        let timeout_secs = self.timeout.as_secs().max(1);
        let popped: Option<(String, Vec<u8>)> = conn.blpop(&reply_list, timeout_secs as f64).await?;
        let (_, raw) = popped.ok_or_else(|| anyhow::anyhow!("rpc call to {queue} timed out after {timeout_secs}s"))?;
        let _: () = conn.del(&reply_list).await?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[derive(Serialize)]
struct RpcEnvelope<'a, T> {
    reply_to: String,
    payload: &'a T,
}

/// Wraps a `RedisRpcTransport` with the queue name and a method discriminator
/// carried in the envelope, so extraction/translate/M101/Diffbot traffic can
/// share one transport while still routing to distinct worker pools.
pub struct QueuedRpcClient {
    transport: RedisRpcTransport,
    queue: String,
}

impl QueuedRpcClient {
    pub fn new(transport: RedisRpcTransport, queue: impl Into<String>) -> Self {
        Self { transport, queue: queue.into() }
    }

    pub async fn call<Req, Resp>(&self, method: &str, args: Req) -> anyhow::Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let request = MethodRequest { method, args };
        self.transport.call(&self.queue, &request).await
    }
}

#[derive(Serialize)]
struct MethodRequest<'a, T> {
    method: &'a str,
    args: T,
}
