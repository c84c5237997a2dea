//! The two downstream collaborators a flushed bucket is written to: a
//! time-series sink (UDP batch-points write) and a metric gateway
//! (per-sample distribution/count).

use async_trait::async_trait;
use productcrawl_types::MetricTags;

#[derive(Debug, Clone)]
pub struct TimeSeriesPoint {
    pub measurement: &'static str,
    pub tags: MetricTags,
    pub count: u64,
    pub latency_sum_ms: f64,
    pub value_sum: f64,
    pub content_length_sum: u64,
}

#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn write_points(&self, points: &[TimeSeriesPoint]) -> anyhow::Result<()>;
}

#[async_trait]
pub trait MetricGateway: Send + Sync {
    async fn distribution(&self, name: &str, value: f64, tags: &MetricTags) -> anyhow::Result<()>;

    async fn count(&self, name: &str, value: i64, tags: &MetricTags) -> anyhow::Result<()>;
}
