//! # productcrawl-types
//!
//! Shared data model for the product-crawl worker: the dynamic `Value` used
//! for schema-less wrapper output, the `Workflow`/`Batch` unit-of-work
//! containers, domain/KV-store/extraction record shapes, metric samples, and
//! the `CrawlError` propagated across every component boundary.

pub mod batch;
pub mod domain;
pub mod error;
pub mod extraction;
pub mod kvstore;
pub mod metrics;
pub mod value;
pub mod workflow;

pub use batch::{Batch, DataPipelineFlags, JobParams, TaskMeta};
pub use domain::{DomainInfo, SiteDetail, Wrapper};
pub use error::{CrawlError, CrawlErrorCode, CrawlResult};
pub use extraction::{ExtractionMetrics, ExtractionResponse, UnresolvedAjaxRequest, WebResponse};
pub use kvstore::{KvRecord, RdstoreUpdateRequest, VariationRecord};
pub use metrics::{CrawlMetrics, MetricTags, ProductMetrics, SourceInvocationSample};
pub use value::{AttrMap, Value};
pub use workflow::{Workflow, WorkflowFlags};
