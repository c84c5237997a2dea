//! Job-server client: loads discovered tasks directly into a job's queue,
//! and re-publishes a single task when a site's bounded pool is saturated
//! in queue-consumer mode.

use async_trait::async_trait;
use productcrawl_discovery::JobServerLoader;
use productcrawl_pool::QueueRequeuer;

pub struct HttpJobServerClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpJobServerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[async_trait]
impl JobServerLoader for HttpJobServerClient {
    async fn load_tasks(&self, job_id: &str, tasks: &[String]) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/jobs/{job_id}/tasks", self.base_url))
            .json(&tasks)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl QueueRequeuer for HttpJobServerClient {
    async fn requeue(&self, url: &str) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/jobs/requeue", self.base_url))
            .query(&[("url", url)])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
