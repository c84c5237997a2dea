//! The three append-only sample channels the aggregator bucketizes: crawl,
//! product, and extraction metrics.

use productcrawl_types::{CrawlMetrics, ExtractionMetrics, MetricTags, ProductMetrics};

#[derive(Debug, Clone)]
pub enum MetricSample {
    Crawl(CrawlMetrics),
    Product(ProductMetrics),
    Extraction(ExtractionMetrics),
}

impl MetricSample {
    pub fn tags(&self) -> &MetricTags {
        match self {
            MetricSample::Crawl(m) => &m.tags,
            MetricSample::Product(m) => &m.tags,
            MetricSample::Extraction(m) => &m.tags,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MetricSample::Crawl(_) => "crawl",
            MetricSample::Product(_) => "product",
            MetricSample::Extraction(_) => "extraction",
        }
    }
}
