//! UDP metric transports. `UdpInfluxSink` writes the aggregator's flushed
//! `TimeSeriesPoint`s as InfluxDB line protocol to `INFLUXDB_ADDR`;
//! `UdpDatadogGateway` writes per-sample distribution/count metrics as
//! DogStatsD lines to `GLOBAL_DATADOG_HOST`. Both are fire-and-forget: a
//! dropped datagram loses one sample, never the crawl.

use async_trait::async_trait;
use productcrawl_metrics::{MetricGateway, MetricsSink, TimeSeriesPoint};
use productcrawl_types::MetricTags;
use tokio::net::UdpSocket;

async fn bound_socket() -> anyhow::Result<UdpSocket> {
    Ok(UdpSocket::bind("0.0.0.0:0").await?)
}

fn tag_str(tags: &MetricTags) -> String {
    format!("customer={},site={},job_type={}", tags.customer, tags.site, tags.job_type)
}

pub struct UdpInfluxSink {
    addr: String,
}

impl UdpInfluxSink {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl MetricsSink for UdpInfluxSink {
    async fn write_points(&self, points: &[TimeSeriesPoint]) -> anyhow::Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let socket = bound_socket().await?;
        let mut lines = String::new();
        for point in points {
            lines.push_str(&format!(
                "{},{} count={}i,latency_sum_ms={},value_sum={},content_length_sum={}i\n",
                point.measurement,
                tag_str(&point.tags),
                point.count,
                point.latency_sum_ms,
                point.value_sum,
                point.content_length_sum,
            ));
        }
        socket.send_to(lines.as_bytes(), &self.addr).await?;
        Ok(())
    }
}

pub struct UdpDatadogGateway {
    addr: String,
}

impl UdpDatadogGateway {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    async fn send(&self, line: String) -> anyhow::Result<()> {
        let socket = bound_socket().await?;
        socket.send_to(line.as_bytes(), &self.addr).await?;
        Ok(())
    }
}

#[async_trait]
impl MetricGateway for UdpDatadogGateway {
    async fn distribution(&self, name: &str, value: f64, tags: &MetricTags) -> anyhow::Result<()> {
        self.send(format!("{name}:{value}|d|#{}", tag_str(tags))).await
    }

    async fn count(&self, name: &str, value: i64, tags: &MetricTags) -> anyhow::Result<()> {
        self.send(format!("{name}:{value}|c|#{}", tag_str(tags))).await
    }
}
