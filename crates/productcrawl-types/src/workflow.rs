//! Workflow: the per-URL state container produced and mutated by exactly
//! one worker, from batch dispatch through result aggregation.

use crate::batch::JobParams;
use crate::domain::DomainInfo;
use crate::error::CrawlError;
use crate::extraction::{ExtractionResponse, WebResponse};
use crate::kvstore::KvRecord;
use crate::metrics::{ExtractionMetrics as ExtractionMetricsSample, ProductMetrics, SourceInvocationSample};
use crate::value::AttrMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Flags distinguishing the three boolean knobs the executor and strategies
/// read and write as the workflow progresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowFlags {
    pub post_ops_called: bool,
    pub pre_ops_failed: bool,
    pub send_failure_as_feedback: bool,
}

/// The unit of work for one URL within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub url: String,
    pub job_type: String,
    pub job_params: JobParams,
    pub domain_info: Option<DomainInfo>,
    pub kv_record: Option<KvRecord>,
    pub web_response: Option<WebResponse>,
    pub extraction: Option<ExtractionResponse>,
    pub products: Vec<AttrMap>,
    pub product_metrics: ProductMetrics,
    pub extraction_metrics: Vec<ExtractionMetricsSample>,
    pub cache_key: Option<String>,
    pub crawl_timestamp: i64,
    pub success: bool,
    pub failure_type: Option<String>,
    pub failure_message: Option<String>,
    pub validation_errors: Vec<String>,
    pub translate_cache_aux: HashMap<String, String>,
    pub flags: WorkflowFlags,
    pub data_sources: Vec<String>,
    pub extraction_data_source: Option<String>,
    pub request_id: Option<String>,
    /// Most recent source visited by a CASCADE merge run; overwritten on
    /// every source attempt, so only the last one seen survives.
    pub last_source_sample: Option<SourceInvocationSample>,
}

impl Workflow {
    pub fn new(url: String, job_type: String, job_params: JobParams, crawl_timestamp: i64) -> Self {
        Workflow {
            url,
            job_type,
            job_params,
            domain_info: None,
            kv_record: None,
            web_response: None,
            extraction: None,
            products: Vec::new(),
            product_metrics: ProductMetrics::default(),
            extraction_metrics: Vec::new(),
            cache_key: None,
            crawl_timestamp,
            success: false,
            failure_type: None,
            failure_message: None,
            validation_errors: Vec::new(),
            translate_cache_aux: HashMap::new(),
            flags: WorkflowFlags::default(),
            data_sources: Vec::new(),
            extraction_data_source: None,
            request_id: None,
            last_source_sample: None,
        }
    }

    /// Invariant: `FailureType` is non-empty iff `Status == 0`,
    /// restated here as `success == false iff failure_type.is_some()`.
    pub fn fail(&mut self, err: &CrawlError) {
        self.success = false;
        self.failure_type = Some(err.wire_code());
        self.failure_message = Some(err.message.clone());
    }

    pub fn succeed(&mut self) {
        self.success = true;
        self.failure_type = None;
        self.failure_message = None;
    }

    /// De-duplicates `products` by `_id`, keeping the first occurrence.
    pub fn dedup_products_by_id(&mut self) {
        let mut seen = std::collections::HashSet::new();
        self.products.retain(|p| {
            let id = p.get("_id").and_then(|v| v.as_str()).map(str::to_owned);
            match id {
                Some(id) => seen.insert(id),
                None => true,
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlErrorCode;
    use crate::value::Value;

    fn new_workflow() -> Workflow {
        Workflow::new("http://example.com/p1".into(), "recrawl".into(), JobParams::default(), 0)
    }

    #[test]
    fn fail_and_succeed_keep_invariant() {
        let mut wf = new_workflow();
        wf.fail(&CrawlError::new(CrawlErrorCode::NotProductPage, "not a product"));
        assert!(!wf.success);
        assert!(wf.failure_type.is_some());
        wf.succeed();
        assert!(wf.success);
        assert!(wf.failure_type.is_none());
    }

    #[test]
    fn dedup_products_by_id_keeps_first_only() {
        let mut wf = new_workflow();
        let mut p1 = AttrMap::new();
        p1.insert("_id".into(), Value::String("a".into()));
        p1.insert("name".into(), Value::String("first".into()));
        let mut p2 = AttrMap::new();
        p2.insert("_id".into(), Value::String("a".into()));
        p2.insert("name".into(), Value::String("second".into()));
        wf.products = vec![p1, p2];
        wf.dedup_products_by_id();
        assert_eq!(wf.products.len(), 1);
        assert_eq!(wf.products[0].get("name").and_then(Value::as_str), Some("first"));
    }
}
