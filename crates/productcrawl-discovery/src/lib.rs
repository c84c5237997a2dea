//! # productcrawl-discovery
//!
//! Link classification, sitemap XML parsing, and the batched KV-store
//! dedup + spidering-history reporting the discovery strategy's post-crawl
//! phase runs.

pub mod classify;
pub mod dedup;
pub mod feedback;
pub mod sitemap;

pub use classify::{classify_url, ClassifiedLink};
pub use dedup::{filter_product_links, ParentSkuLookup, ParentSkuStatus, PartialDomainInfo, PartialDomainInfoResolver};
pub use feedback::{filter_job_server_feedback_links, FeedbackOutcome, JobServerLoader, SpideringHistorySink, SpideringOutput};
pub use sitemap::extract_sitemap_urls;
