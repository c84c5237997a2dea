//! Metric sample shapes produced while a workflow runs, consumed by the
//! aggregator in `productcrawl-metrics`.

use serde::{Deserialize, Serialize};

/// Tag tuple every sample is bucketized by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricTags {
    pub customer: String,
    pub site: String,
    pub job_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlMetrics {
    pub tags: MetricTags,
    pub latency_ms: f64,
    pub status: i32,
    pub content_length: usize,
}

/// Per-request fetch-loop metrics accumulated onto the owning workflow:
/// latency and attempt counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductMetrics {
    pub tags: MetricTags,
    pub attempts: u32,
    pub total_latency_ms: f64,
    pub products_found: u32,
}

impl ProductMetrics {
    pub fn record_attempt(&mut self, latency_ms: f64) {
        self.attempts += 1;
        self.total_latency_ms += latency_ms;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionMetrics {
    pub tags: MetricTags,
    pub iteration: u32,
    pub duration_ms: f64,
    pub source: String,
}

/// A single source-invocation sample in the CASCADE merge path: recorded
/// once per source call, with "last code seen wins" when several samples
/// are recorded for the same workflow/source pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceInvocationSample {
    pub source: String,
    pub code: String,
    pub duration_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_attempt_accumulates_latency() {
        let mut m = ProductMetrics::default();
        m.record_attempt(100.0);
        m.record_attempt(50.0);
        assert_eq!(m.attempts, 2);
        assert_eq!(m.total_latency_ms, 150.0);
    }
}
