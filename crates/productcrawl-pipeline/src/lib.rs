//! Mission pipeline strategies and the shared crawl executor spine.

pub mod context;
pub mod executor;
pub mod strategies;
pub mod strategy;

pub use context::{DataSourceMapStore, DomainInfoResolver, KvStoreReader, PipelineContext};
pub use executor::run_pipeline;
pub use strategies::{CrawlStrategy, DiscoveryStrategy, OnDemandStrategy, QaStrategy, RealtimeStrategy, RecrawlStrategy, TestWrapperStrategy};
pub use strategy::{PipelineStrategy, PreCrawlOutcome, RequestConfig};

/// Resolves the strategy for a job type, dispatching on the job's type
/// string.
pub fn strategy_for_job_type(job_type: &str) -> std::sync::Arc<dyn PipelineStrategy> {
    match job_type {
        "recrawl" => std::sync::Arc::new(RecrawlStrategy),
        "realtimeapi" | "webhooks_daily" | "webhooks_hourly" => std::sync::Arc::new(RealtimeStrategy),
        "ondemand" => std::sync::Arc::new(OnDemandStrategy),
        "discovery" => std::sync::Arc::new(DiscoveryStrategy),
        "testwrapper" => std::sync::Arc::new(TestWrapperStrategy),
        "wrapperqa" => std::sync::Arc::new(QaStrategy),
        _ => std::sync::Arc::new(CrawlStrategy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_job_type_falls_back_to_generic_crawl() {
        assert_eq!(strategy_for_job_type("something_unlisted").name(), "crawl");
    }

    #[test]
    fn webhooks_job_types_use_realtime_strategy() {
        assert_eq!(strategy_for_job_type("webhooks_daily").name(), "realtime");
        assert_eq!(strategy_for_job_type("webhooks_hourly").name(), "realtime");
    }
}
