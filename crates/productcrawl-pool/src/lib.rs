//! # productcrawl-pool
//!
//! Bounded batch worker pool: spawn `min(batch_size, 12)` workers over a
//! batch's URLs, route each through an optional per-site concurrency cap,
//! and aggregate per-URL results.

pub mod batch;
pub mod site_pool;

pub use batch::{run_batch, worker_count, QueueRequeuer, TaskResult, WorkflowExecutor, BACKPRESSURE_PAUSE, MAX_WORKERS};
pub use site_pool::{SitePoolAcquisition, SitePools};

use productcrawl_types::ProductMetrics;

/// Per-URL product-count/latency line, printed after a batch completes.
pub fn log_product_metrics(url: &str, metrics: &ProductMetrics) {
    tracing::info!(
        url,
        attempts = metrics.attempts,
        total_latency_ms = metrics.total_latency_ms,
        products_found = metrics.products_found,
        "BATCH_PRODUCT_METRICS"
    );
}
