//! The bucketizing aggregator task: every sample is both
//! emitted immediately to the metric gateway and folded into a per-tag
//! bucket; a wall-clock timer flushes and clears every bucket to the
//! time-series sink.

use crate::sample::MetricSample;
use crate::sink::{MetricGateway, MetricsSink, TimeSeriesPoint};
use productcrawl_types::MetricTags;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEV_FLUSH_INTERVAL: Duration = Duration::from_secs(60);
pub const PROD_FLUSH_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Default)]
struct Bucket {
    count: u64,
    latency_sum_ms: f64,
    value_sum: f64,
    content_length_sum: u64,
}

/// A cheap handle for publishing samples; cloneable, backed by an unbounded
/// channel so callers never block on the aggregator's flush cadence.
#[derive(Clone)]
pub struct MetricsHandle {
    tx: mpsc::UnboundedSender<MetricSample>,
}

impl MetricsHandle {
    pub fn record(&self, sample: MetricSample) {
        if self.tx.send(sample).is_err() {
            tracing::warn!("METRICS_AGGREGATOR_CHANNEL_CLOSED");
        }
    }
}

/// Spawns the aggregator task and returns a handle to publish samples plus
/// the task's join handle. Graceful shutdown would drop the handle and
/// await the join handle to let the final flush happen; in practice the
/// process simply exits and the last partial bucket is dropped.
pub fn spawn_aggregator(
    sink: Arc<dyn MetricsSink>,
    gateway: Arc<dyn MetricGateway>,
    flush_interval: Duration,
) -> (MetricsHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<MetricSample>();

    let handle = tokio::spawn(async move {
        let mut buckets: HashMap<(&'static str, MetricTags), Bucket> = HashMap::new();
        let mut ticker = tokio::time::interval(flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                sample = rx.recv() => {
                    let Some(sample) = sample else { break };
                    emit_to_gateway(gateway.as_ref(), &sample).await;
                    accumulate(&mut buckets, sample);
                }
                _ = ticker.tick() => {
                    flush(sink.as_ref(), &mut buckets).await;
                }
            }
        }

        flush(sink.as_ref(), &mut buckets).await;
    });

    (MetricsHandle { tx }, handle)
}

async fn emit_to_gateway(gateway: &dyn MetricGateway, sample: &MetricSample) {
    let tags = sample.tags();
    let result = match sample {
        MetricSample::Crawl(m) => gateway.distribution("crawl.latency_ms", m.latency_ms, tags).await,
        MetricSample::Product(m) => gateway.count("product.attempts", m.attempts as i64, tags).await,
        MetricSample::Extraction(m) => gateway.distribution("extraction.duration_ms", m.duration_ms, tags).await,
    };
    if let Err(err) = result {
        tracing::warn!(%err, "METRIC_GATEWAY_EMIT_FAILED");
    }
}

fn accumulate(buckets: &mut HashMap<(&'static str, MetricTags), Bucket>, sample: MetricSample) {
    let key = (sample.kind(), sample.tags().clone());
    let bucket = buckets.entry(key).or_default();
    bucket.count += 1;
    match sample {
        MetricSample::Crawl(m) => {
            bucket.latency_sum_ms += m.latency_ms;
            bucket.content_length_sum += m.content_length as u64;
        }
        MetricSample::Product(m) => {
            bucket.latency_sum_ms += m.total_latency_ms;
            bucket.value_sum += m.products_found as f64;
        }
        MetricSample::Extraction(m) => {
            bucket.latency_sum_ms += m.duration_ms;
            bucket.value_sum += m.iteration as f64;
        }
    }
}

async fn flush(sink: &dyn MetricsSink, buckets: &mut HashMap<(&'static str, MetricTags), Bucket>) {
    if buckets.is_empty() {
        return;
    }
    let points: Vec<TimeSeriesPoint> = buckets
        .drain()
        .map(|((kind, tags), bucket)| TimeSeriesPoint {
            measurement: kind,
            tags,
            count: bucket.count,
            latency_sum_ms: bucket.latency_sum_ms,
            value_sum: bucket.value_sum,
            content_length_sum: bucket.content_length_sum,
        })
        .collect();
    if let Err(err) = sink.write_points(&points).await {
        tracing::warn!(%err, "METRICS_FLUSH_FAILED");
    }
}
