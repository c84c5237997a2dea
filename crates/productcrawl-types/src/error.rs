//! Crawl error codes and the composable error type carried through the
//! pipeline. Codes are short upper-snake strings so they serialize
//! identically to the wire contract consumed by the job server and REST
//! clients.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CrawlErrorCode {
    BadInput,
    JobParamsReadErr,
    RetrieveDomainInfoFail,
    NoSiteDetail,
    SiteStatusCheckFailed,
    NotProductPage,
    DomainNotSupported,
    RdstoreDataMissing,
    RdstoreDataMissingEarly,
    RdstoreReadTimeout,
    RdstoreWriteTimeout,
    Http500Error,
    DoesNotExist,
    Unreachable,
    ExtractionRpcTimeout,
    RedirectSkuError,
    ExtractionFailed,
    ExtractionFailedNoProds,
    ExtractionMaxCyclesExceeded,
    ExtractionWrapperEmpty,
    RateLimitExceeded,
    ValidateDataFail,
    /// Catch-all for a code string not in the above table (e.g. a
    /// `<SRC>_RATELIMIT_EXCEEDED` variant carrying its source name, or a
    /// code forwarded verbatim from an external collaborator).
    Other(&'static str),
}

impl CrawlErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            CrawlErrorCode::BadInput => "BAD_INPUT",
            CrawlErrorCode::JobParamsReadErr => "JOBPARAMS_READERR",
            CrawlErrorCode::RetrieveDomainInfoFail => "RETRIEVE_DOMAIN_INFO_FAIL",
            CrawlErrorCode::NoSiteDetail => "NO_SITEDETAIL",
            CrawlErrorCode::SiteStatusCheckFailed => "SITE_STATUS_CHECK_FAILED",
            CrawlErrorCode::NotProductPage => "NOT_PRODUCT_PAGE",
            CrawlErrorCode::DomainNotSupported => "DOMAIN_NOT_SUPPORTED",
            CrawlErrorCode::RdstoreDataMissing => "RDSTORE_DATA_MISSING",
            CrawlErrorCode::RdstoreDataMissingEarly => "RDSTORE_DATA_MISSING_EARLY",
            CrawlErrorCode::RdstoreReadTimeout => "RDSTORE_READ_TIMEOUT",
            CrawlErrorCode::RdstoreWriteTimeout => "RDSTORE_WRITE_TIMEOUT",
            CrawlErrorCode::Http500Error => "HTTP_500_ERROR",
            CrawlErrorCode::DoesNotExist => "DOES_NOT_EXIST",
            CrawlErrorCode::Unreachable => "UNREACHABLE",
            CrawlErrorCode::ExtractionRpcTimeout => "EXTRACTION_RPC_TIMEOUT",
            CrawlErrorCode::RedirectSkuError => "REDIRECT_SKU_ERROR",
            CrawlErrorCode::ExtractionFailed => "EXTRACTION_FAILED",
            CrawlErrorCode::ExtractionFailedNoProds => "EXTRACTION_FAILED_NOPRODS",
            CrawlErrorCode::ExtractionMaxCyclesExceeded => "EXTRACTION_MAX_CYCLES_EXCEEDED",
            CrawlErrorCode::ExtractionWrapperEmpty => "EXTRACTION_WRAPPER_EMPTY",
            CrawlErrorCode::RateLimitExceeded => "RATELIMIT_EXCEEDED",
            CrawlErrorCode::ValidateDataFail => "VALIDATE_DATA_FAIL",
            CrawlErrorCode::Other(s) => s,
        }
    }

    /// Statuses the fetch loop treats as transient and therefore retryable.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CrawlErrorCode::Http500Error
                | CrawlErrorCode::Unreachable
                | CrawlErrorCode::ExtractionRpcTimeout
                | CrawlErrorCode::RdstoreReadTimeout
                | CrawlErrorCode::RdstoreWriteTimeout
                | CrawlErrorCode::RateLimitExceeded
        )
    }
}

impl fmt::Display for CrawlErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error carried through a workflow. Composable: a cause chain is built
/// up as an error crosses component boundaries, and a helper renders
/// `code_cause` / `message, cause` when nesting is requested.
#[derive(Error, Debug, Clone)]
#[error("{code}: {message}")]
pub struct CrawlError {
    pub code: CrawlErrorCode,
    pub message: String,
    pub cause: Option<Box<CrawlError>>,
    /// Set by a strategy whose `transform_error` prefixes every outgoing
    /// code (the realtime strategy's `REALTIME_` prefix) rather than
    /// rewriting it to a different fixed variant.
    pub code_prefix: Option<&'static str>,
}

impl CrawlError {
    pub fn new(code: CrawlErrorCode, message: impl Into<String>) -> Self {
        CrawlError {
            code,
            message: message.into(),
            cause: None,
            code_prefix: None,
        }
    }

    pub fn with_cause(code: CrawlErrorCode, message: impl Into<String>, cause: CrawlError) -> Self {
        CrawlError {
            code,
            message: message.into(),
            cause: Some(Box::new(cause)),
            code_prefix: None,
        }
    }

    /// Rewrites the code while keeping the message and nesting the previous
    /// error as the cause — this is what a strategy's `transform_error` does
    /// before a code leaves the process.
    pub fn rewrite(self, new_code: CrawlErrorCode) -> Self {
        let message = self.message.clone();
        CrawlError::with_cause(new_code, message, self)
    }

    /// Wraps the code's string form in a fixed prefix without otherwise
    /// changing the error, for strategies that prefix every outgoing code.
    pub fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.code_prefix = Some(prefix);
        self
    }

    /// The code string as it should leave the process: the fixed variant's
    /// string form, wrapped in `code_prefix` if one was set.
    pub fn wire_code(&self) -> String {
        match self.code_prefix {
            Some(prefix) => format!("{prefix}{}", self.code.as_str()),
            None => self.code.as_str().to_string(),
        }
    }

    /// Renders `code_cause` / `message, cause` the way a composable error
    /// does when asked to nest; non-composable leaves just render their own
    /// display.
    pub fn composed(&self) -> String {
        match &self.cause {
            Some(cause) => format!("{}_{}, {}, {}", self.code, cause.code, self.message, cause.message),
            None => format!("{}, {}", self.code, self.message),
        }
    }
}

pub type CrawlResult<T> = Result<T, CrawlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_display_matches_wire_contract() {
        assert_eq!(CrawlErrorCode::RdstoreDataMissingEarly.as_str(), "RDSTORE_DATA_MISSING_EARLY");
    }

    #[test]
    fn rewrite_nests_previous_error_as_cause() {
        let original = CrawlError::new(CrawlErrorCode::RdstoreReadTimeout, "timed out after 5s");
        let rewritten = original.rewrite(CrawlErrorCode::RdstoreDataMissingEarly);
        assert_eq!(rewritten.code, CrawlErrorCode::RdstoreDataMissingEarly);
        assert_eq!(rewritten.cause.unwrap().code, CrawlErrorCode::RdstoreReadTimeout);
    }

    #[test]
    fn transient_classification_matches_retry_table() {
        assert!(CrawlErrorCode::Http500Error.is_transient());
        assert!(!CrawlErrorCode::NotProductPage.is_transient());
    }
}
