//! Batch worker pool: bounded-worker fan-out over a batch's URLs.

use crate::site_pool::{SitePoolAcquisition, SitePools};
use async_trait::async_trait;
use productcrawl_types::AttrMap;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

pub const MAX_WORKERS: usize = 12;
pub const BACKPRESSURE_PAUSE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TaskResult {
    pub status: bool,
    pub failure_type: Option<String>,
    pub failure_message: Option<String>,
    pub feedback: Option<HashMap<String, AttrMap>>,
}

#[async_trait]
pub trait WorkflowExecutor: Send + Sync {
    async fn execute(&self, url: &str) -> TaskResult;
}

/// Re-publishes a single-task batch to the originating queue; only called
/// in queue-consumer mode when a site's bounded pool is saturated.
#[async_trait]
pub trait QueueRequeuer: Send + Sync {
    async fn requeue(&self, url: &str) -> anyhow::Result<()>;
}

pub fn worker_count(batch_size: usize) -> usize {
    batch_size.min(MAX_WORKERS).max(1)
}

/// Runs every URL in `urls` through `executor`, spawning
/// `min(urls.len(), 12)` concurrent workers that pull from a shared queue.
/// `site_of` resolves a URL to the site key used by `site_pools`. In
/// queue-consumer mode, a URL whose site pool is saturated is re-published
/// via `requeuer` after a 2-second pause instead of being executed, and is
/// omitted from the returned results (the caller's queue will redeliver it).
#[allow(clippy::too_many_arguments)]
pub async fn run_batch(
    urls: Vec<String>,
    site_of: Arc<dyn Fn(&str) -> String + Send + Sync>,
    executor: Arc<dyn WorkflowExecutor>,
    site_pools: Arc<SitePools>,
    queue_consumer_mode: bool,
    requeuer: Option<Arc<dyn QueueRequeuer>>,
) -> HashMap<String, TaskResult> {
    let queue = Arc::new(StdMutex::new(VecDeque::from(urls)));
    let results = Arc::new(StdMutex::new(HashMap::new()));
    let workers = worker_count(queue.lock().unwrap().len());

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let results = Arc::clone(&results);
        let site_of = Arc::clone(&site_of);
        let executor = Arc::clone(&executor);
        let site_pools = Arc::clone(&site_pools);
        let requeuer = requeuer.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let url = {
                    let mut q = queue.lock().unwrap();
                    q.pop_front()
                };
                let Some(url) = url else { break };

                let site = site_of(&url);
                match site_pools.try_acquire(&site) {
                    SitePoolAcquisition::PendingQueueFull if queue_consumer_mode => {
                        tokio::time::sleep(BACKPRESSURE_PAUSE).await;
                        if let Some(requeuer) = &requeuer {
                            if let Err(err) = requeuer.requeue(&url).await {
                                tracing::warn!(url = %url, %err, "BACKPRESSURE_REQUEUE_FAILED");
                            }
                        }
                        continue;
                    }
                    SitePoolAcquisition::PendingQueueFull => {
                        // Non-queue-consumer callers have nowhere to bounce the
                        // task to; run it anyway rather than dropping it.
                    }
                    SitePoolAcquisition::Unbounded | SitePoolAcquisition::Acquired(_) => {}
                }

                let result = executor.execute(&url).await;
                results.lock().unwrap().insert(url, result);
            }
        }));
    }

    futures::future::join_all(handles).await;
    Arc::try_unwrap(results).map(|m| m.into_inner().unwrap()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as StdHashMap;

    struct EchoExecutor;
    #[async_trait]
    impl WorkflowExecutor for EchoExecutor {
        async fn execute(&self, _url: &str) -> TaskResult {
            TaskResult { status: true, ..Default::default() }
        }
    }

    #[test]
    fn worker_count_caps_at_twelve() {
        assert_eq!(worker_count(3), 3);
        assert_eq!(worker_count(100), 12);
        assert_eq!(worker_count(0), 1);
    }

    #[tokio::test]
    async fn every_url_gets_a_result() {
        let urls: Vec<String> = (0..20).map(|i| format!("http://example.com/p{i}")).collect();
        let results = run_batch(
            urls.clone(),
            Arc::new(|_: &str| "example.com".to_string()),
            Arc::new(EchoExecutor),
            Arc::new(SitePools::new(StdHashMap::new())),
            false,
            None,
        )
        .await;
        assert_eq!(results.len(), urls.len());
        assert!(results.values().all(|r| r.status));
    }
}
