//! Non-REST run modes: a job-server long-poll worker, a Redis queue
//! consumer, and the two local test modes (single URL, file of URLs).

use crate::composition::build_job_server_client;
use crate::executor::PipelineWorkflowExecutor;
use productcrawl_config::AppConfig;
use productcrawl_pipeline::PipelineContext;
use productcrawl_pool::{run_batch, SitePools, WorkflowExecutor};
use productcrawl_types::JobParams;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn site_of(url: &str) -> String {
    reqwest::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)).unwrap_or_default()
}

fn site_of_fn() -> Arc<dyn Fn(&str) -> String + Send + Sync> {
    Arc::new(site_of)
}

#[derive(serde::Deserialize)]
struct NextJobResponse {
    job_id: String,
    job_type: String,
    #[serde(default)]
    job_params: JobParams,
    urls: Vec<String>,
}

/// Long-polls the job server for the next batch, runs it, and reports
/// results back. Runs until `shutdown` resolves.
pub async fn run_job_server_worker(
    config: &AppConfig,
    ctx: Arc<PipelineContext>,
    worker_id: Option<String>,
    jobserver_override: Option<String>,
    shutdown: impl std::future::Future<Output = ()>,
) -> anyhow::Result<()> {
    let jobserver_addr = jobserver_override.unwrap_or_else(|| config.jobserver_addr.clone());
    let worker_id = worker_id.unwrap_or_else(|| format!("worker-{}", uuid::Uuid::new_v4()));
    let client = reqwest::Client::new();
    let site_pools = Arc::new(SitePools::new(HashMap::new()));
    let requeuer = Arc::new(build_job_server_client(config));

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(worker_id, "JOBSERVER_WORKER_SHUTDOWN");
                return Ok(());
            }
            next = client.get(format!("{jobserver_addr}/jobs/next")).query(&[("worker_id", worker_id.as_str())]).send() => {
                let batch = match next {
                    Ok(resp) if resp.status() == reqwest::StatusCode::NO_CONTENT => {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                    Ok(resp) => match resp.error_for_status() {
                        Ok(resp) => match resp.json::<NextJobResponse>().await {
                            Ok(batch) => batch,
                            Err(err) => {
                                tracing::warn!(%err, "JOBSERVER_POLL_DECODE_FAILED");
                                tokio::time::sleep(Duration::from_secs(1)).await;
                                continue;
                            }
                        },
                        Err(err) => {
                            tracing::warn!(%err, "JOBSERVER_POLL_FAILED");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            continue;
                        }
                    },
                    Err(err) => {
                        tracing::warn!(%err, "JOBSERVER_POLL_FAILED");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                };

                let mut job_params = batch.job_params;
                job_params.job_id = batch.job_id.clone();
                job_params.job_type = batch.job_type.clone();
                let executor: Arc<dyn WorkflowExecutor> = Arc::new(PipelineWorkflowExecutor::new(ctx.clone(), job_params));

                let results = run_batch(batch.urls, site_of_fn(), executor, site_pools.clone(), false, None).await;
                report_results(&client, &jobserver_addr, &batch.job_id, &results).await;
            }
        }
    }
}

async fn report_results(client: &reqwest::Client, jobserver_addr: &str, job_id: &str, results: &HashMap<String, productcrawl_pool::TaskResult>) {
    let payload: HashMap<&str, &productcrawl_pool::TaskResult> = results.iter().map(|(k, v)| (k.as_str(), v)).collect();
    if let Err(err) = client.post(format!("{jobserver_addr}/jobs/{job_id}/results")).json(&payload).send().await {
        tracing::warn!(job_id, %err, "JOBSERVER_RESULT_REPORT_FAILED");
    }
}

/// Pulls single-task batches off a Redis list (`{job_type}:queue`) and runs
/// each through the pool with queue-consumer backpressure semantics.
pub async fn run_queue_consumer(config: &AppConfig, ctx: Arc<PipelineContext>, shutdown: impl std::future::Future<Output = ()>) -> anyhow::Result<()> {
    let client = redis::Client::open(format!("redis://{}", config.redis_host_addr))?;
    let mut conn = client.get_multiplexed_tokio_connection().await?;
    let site_pools = Arc::new(SitePools::new(HashMap::new()));
    let requeuer = Arc::new(build_job_server_client(config));

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("QUEUE_CONSUMER_SHUTDOWN");
                return Ok(());
            }
            popped = conn.blpop::<_, Option<(String, String)>>("crawl:tasks", 5.0) => {
                let Some((_, raw)) = popped? else { continue };
                let Ok(task) = serde_json::from_str::<QueuedTask>(&raw) else {
                    tracing::warn!(raw, "QUEUE_TASK_DECODE_FAILED");
                    continue;
                };

                let mut job_params = task.job_params;
                job_params.job_id = task.job_id;
                job_params.job_type = task.job_type;
                let executor: Arc<dyn WorkflowExecutor> = Arc::new(PipelineWorkflowExecutor::new(ctx.clone(), job_params));

                let _ = run_batch(vec![task.url], site_of_fn(), executor, site_pools.clone(), true, Some(requeuer.clone() as Arc<dyn productcrawl_pool::QueueRequeuer>)).await;
            }
        }
    }
}

#[derive(serde::Deserialize)]
struct QueuedTask {
    job_id: String,
    job_type: String,
    #[serde(default)]
    job_params: JobParams,
    url: String,
}

pub async fn run_single_url_test(ctx: Arc<PipelineContext>, job_type: String, url: String) -> anyhow::Result<()> {
    let job_params = JobParams { job_type: job_type.clone(), job_id: "test".to_string(), ..Default::default() };
    let executor = PipelineWorkflowExecutor::new(ctx, job_params);
    let result = executor.execute(&url).await;
    tracing::info!(url, status = result.status, failure_type = ?result.failure_type, failure_message = ?result.failure_message, "TEST_RESULT");
    Ok(())
}

pub async fn run_file_of_urls_test(ctx: Arc<PipelineContext>, job_type: String, file: String) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(&file).await?;
    let urls: Vec<String> = contents.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect();
    let job_params = JobParams { job_type, job_id: "test-file".to_string(), ..Default::default() };
    let executor: Arc<dyn WorkflowExecutor> = Arc::new(PipelineWorkflowExecutor::new(ctx, job_params));
    let site_pools = Arc::new(SitePools::new(HashMap::new()));
    let results = run_batch(urls, site_of_fn(), executor, site_pools, false, None).await;

    let succeeded = results.values().filter(|r| r.status).count();
    tracing::info!(total = results.len(), succeeded, failed = results.len() - succeeded, "TEST_FILE_COMPLETE");
    for (url, result) in &results {
        if !result.status {
            tracing::warn!(url, failure_type = ?result.failure_type, failure_message = ?result.failure_message, "TEST_FILE_URL_FAILED");
        }
    }
    Ok(())
}
