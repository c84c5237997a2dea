//! Generic rate-limited batched actor, grounded in the Amazon
//! PA-API actor: an unbounded queue feeds a batcher that buckets requests by
//! a caller-supplied key (locale, for Amazon) and dispatches a batch once it
//! reaches `max_items` or a `max_wait` ticker fires. Each batch passes
//! through the per-second token check before the executor runs it.

use crate::rate_limiter::{check_rate_limit_per_second, millis_until_next_second};
use async_trait::async_trait;
use productcrawl_types::{CrawlError, CrawlErrorCode};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::counter_store::CounterStore;

/// One item submitted to the actor, carrying its own reply channel so
/// responses can be correlated back to the caller regardless of batch
/// reordering.
struct Envelope<Req, Resp> {
    payload: Req,
    reply: oneshot::Sender<Resp>,
}

/// Executes one already-rate-limit-cleared batch of requests and returns one
/// response per request, in the same order.
#[async_trait]
pub trait BatchExecutor<Req, Resp>: Send + Sync {
    async fn execute(&self, requests: &[Req]) -> Vec<Resp>;
}

/// Handle used by callers to submit a single request and await its reply.
pub struct ActorHandle<Req, Resp> {
    tx: mpsc::UnboundedSender<Envelope<Req, Resp>>,
}

impl<Req, Resp> Clone for ActorHandle<Req, Resp> {
    fn clone(&self) -> Self {
        ActorHandle { tx: self.tx.clone() }
    }
}

impl<Req, Resp> ActorHandle<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    /// Submits one request and waits for its reply on a dedicated channel.
    pub async fn call(&self, payload: Req) -> Result<Resp, CrawlError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Envelope { payload, reply })
            .map_err(|_| CrawlError::new(CrawlErrorCode::Unreachable, "actor queue closed"))?;
        rx.await
            .map_err(|_| CrawlError::new(CrawlErrorCode::Unreachable, "actor dropped reply channel"))
    }
}

/// Spawns the batcher + dispatch loop and returns a handle to submit work.
/// `key_fn` buckets requests the way Amazon buckets by locale; return the
/// same key for every request that can share one batch.
pub fn spawn_batched_actor<Req, Resp, K>(
    source: impl Into<String>,
    counter_store: Arc<dyn CounterStore>,
    executor: Arc<dyn BatchExecutor<Req, Resp>>,
    max_items: usize,
    max_wait: Duration,
    max_retry: u32,
    key_fn: impl Fn(&Req) -> K + Send + 'static,
) -> ActorHandle<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
    K: Eq + Hash + Send + 'static,
{
    let source = source.into();
    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope<Req, Resp>>();
    let (batch_tx, mut batch_rx) = mpsc::unbounded_channel::<Vec<Envelope<Req, Resp>>>();

    // Batcher: buckets incoming requests by key, flushing on size or timer.
    tokio::spawn(async move {
        let mut buckets: HashMap<K, Vec<Envelope<Req, Resp>>> = HashMap::new();
        let mut ticker = tokio::time::interval(max_wait);
        loop {
            tokio::select! {
                maybe_env = rx.recv() => {
                    match maybe_env {
                        Some(env) => {
                            let key = key_fn(&env.payload);
                            let bucket = buckets.entry(key).or_default();
                            bucket.push(env);
                            if bucket.len() >= max_items {
                                let full = std::mem::take(bucket);
                                if batch_tx.send(full).is_err() {
                                    break;
                                }
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    for bucket in buckets.values_mut() {
                        if !bucket.is_empty() {
                            let full = std::mem::take(bucket);
                            if batch_tx.send(full).is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        }
    });

    // Dispatcher: rate-limit check + sleep-until-next-second retry, then run
    // the batch through the executor and fan replies back out.
    tokio::spawn(async move {
        while let Some(mut batch) = batch_rx.recv().await {
            let mut retries = 0u32;
            loop {
                match check_rate_limit_per_second(counter_store.as_ref(), &source).await {
                    Ok(true) => break,
                    Ok(false) => {
                        if retries >= max_retry {
                            warn!(%source, retries, "RATELIMIT_EXCEEDED, failing batch");
                            // Callers that can't construct a Resp on failure
                            // must encode the failure within Resp itself;
                            // here we simply drop replies so `call` observes
                            // a closed channel and surfaces Unreachable.
                            batch.clear();
                            break;
                        }
                        retries += 1;
                        tokio::time::sleep(Duration::from_millis(millis_until_next_second())).await;
                    }
                    Err(err) => {
                        warn!(%source, %err, "rate limit check failed");
                        batch.clear();
                        break;
                    }
                }
            }
            if batch.is_empty() {
                continue;
            }

            let mut requests = Vec::with_capacity(batch.len());
            let mut replies = Vec::with_capacity(batch.len());
            for env in batch {
                requests.push(env.payload);
                replies.push(env.reply);
            }

            info!(%source, batch_len = requests.len(), "dispatching batch");
            let responses = executor.execute(&requests).await;

            for (reply, resp) in replies.into_iter().zip(responses.into_iter()) {
                let _ = reply.send(resp);
            }
        }
    });

    ActorHandle { tx }
}
