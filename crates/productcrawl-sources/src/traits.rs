//! The one contract every extraction backend implements:
//! `request`/`extract`/`normalize`/`name`/`last_error_code`.

use async_trait::async_trait;
use productcrawl_types::{CrawlError, ExtractionResponse, Workflow};

/// Whether a backend's `request` step produced content ready for `extract`.
pub type CanExtract = bool;

#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    /// Error code set by the most recent `request`/`extract` call, read by
    /// the metrics sample at batch end.
    fn last_error_code(&self) -> Option<String>;

    async fn request(&self, url: &str, workflow: &mut Workflow) -> Result<CanExtract, CrawlError>;

    async fn extract(&self, url: &str, workflow: &mut Workflow) -> Result<(), CrawlError>;

    /// Reshapes `workflow.extraction`/`workflow.products` to the standard
    /// schema. Most backends are a no-op; overridden where normalization
    /// actually differs (Amazon's PA-API shape, for instance).
    fn normalize(&self, _workflow: &mut Workflow) {}
}

/// Abstracts the RPC calls a supervised/unsupervised backend makes to the
/// external extraction service. The wire protocol itself (spec's dropped
/// transport detail) is out of scope; this is the seam a real RPC client
/// plugs into.
#[async_trait]
pub trait ExtractionRpcClient: Send + Sync {
    /// Wrapper-driven extraction against already-fetched HTML.
    async fn extract_supervised(&self, url: &str, workflow: &Workflow) -> Result<ExtractionResponse, CrawlError>;

    /// AI-driven single-call fetch (unsupervised `request`): returns raw
    /// HTML content to be cached, plus a status/error code pair.
    async fn fetch_unsupervised_content(&self, url: &str, request_id: Option<&str>) -> Result<UnsupervisedFetch, CrawlError>;

    /// AI-driven last-mile extraction consuming the cached content written
    /// by `fetch_unsupervised_content` (unsupervised `extract`).
    async fn extract_unsupervised(&self, url: &str, workflow: &Workflow) -> Result<ExtractionResponse, CrawlError>;
}

#[derive(Debug, Clone, Default)]
pub struct UnsupervisedFetch {
    pub status: i32,
    pub html: String,
    pub error_code: Option<String>,
    pub message: Option<String>,
}
