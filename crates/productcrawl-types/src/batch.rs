//! Batch: the unit of dispatch handed to the worker pool, mapping URL to
//! per-task metadata plus job-level context shared by every task in it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Per-URL bookkeeping a batch carries alongside the URL itself. Discovery
/// enriches this on the fly as it classifies links, hence the reader-writer
/// lock around the owning map rather than around each entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMeta {
    pub priority: i32,
    pub link_type: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    pub parent_url: Option<String>,
    #[serde(default)]
    pub ancestor_tags: Vec<String>,
}

/// Job parameters parsed from the incoming task: the subset of job
/// configuration that decision points in the executor and strategies
/// actually read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobParams {
    pub job_id: String,
    pub job_type: String,
    #[serde(default)]
    pub priority_request: i32,
    #[serde(default)]
    pub screenshot: i32,
    #[serde(default)]
    pub disable_cache: bool,
    #[serde(default)]
    pub disable_retry: bool,
    #[serde(default)]
    pub no_category_crawl: bool,
    #[serde(default)]
    pub save_spidering_history: bool,
    #[serde(default)]
    pub data_sources: Vec<String>,
    pub merge_mode: Option<String>,
    /// Optional field-level override of which source wins each product
    /// field, keyed by field name to an ordered list of source names.
    /// Falls back to the default every-field-same-order preference when absent.
    #[serde(default)]
    pub merge_preference: Option<HashMap<String, Vec<String>>>,
    /// Skips the KV-store dedup lookup in the discovery link filter,
    /// keeping every extracted product link regardless of prior crawl state.
    #[serde(default)]
    pub force_discover: bool,
    #[serde(default)]
    pub skus_only: Option<bool>,
    /// When a permanent (4xx) web response arrives, extract anyway instead
    /// of treating the page as discontinued-and-unreadable.
    #[serde(default)]
    pub extract_data: bool,
    /// When set, the test-wrapper strategy pre-loads the KV record and runs
    /// recrawl-style KV bookkeeping after a test crawl.
    #[serde(default)]
    pub as_recrawl: bool,
    /// Realtime's domain-info validation loosens its product-url
    /// requirement to also accept a configured search page when this is set.
    #[serde(default)]
    pub use_search_wrapper: bool,
    /// Cache-read override for the wrapper-QA strategy, which otherwise
    /// never reads from cache.
    #[serde(default)]
    pub cache: bool,
}

/// Optional flags describing the data-pipeline a job should route through,
/// consumed by the test-wrapper strategy's `shouldReadFromStore`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataPipelineFlags {
    #[serde(default)]
    pub read_from_store: bool,
    #[serde(default)]
    pub run_recrawl_etl_prep: bool,
}

/// Mapping from URL to per-task metadata. Also carries batch-id, job-id, job
/// details, job parameters, and optional data-pipeline flags. Immutable
/// during execution except for the task-metadata map.
#[derive(Debug, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: String,
    pub job_id: String,
    pub job_params: JobParams,
    pub data_pipeline: Option<DataPipelineFlags>,
    #[serde(skip, default = "default_task_meta_lock")]
    task_meta: RwLock<HashMap<String, TaskMeta>>,
}

fn default_task_meta_lock() -> RwLock<HashMap<String, TaskMeta>> {
    RwLock::new(HashMap::new())
}

impl Batch {
    pub fn new(batch_id: String, job_id: String, job_params: JobParams, urls: Vec<String>) -> Self {
        let mut map = HashMap::with_capacity(urls.len());
        for url in urls {
            map.insert(url, TaskMeta::default());
        }
        Batch {
            batch_id,
            job_id,
            job_params,
            data_pipeline: None,
            task_meta: RwLock::new(map),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.task_meta.read().unwrap().keys().cloned().collect()
    }

    pub fn task_meta(&self, url: &str) -> Option<TaskMeta> {
        self.task_meta.read().unwrap().get(url).cloned()
    }

    /// Discovery's mutation point: enrich or insert task metadata for a URL
    /// discovered mid-run.
    pub fn set_task_meta(&self, url: String, meta: TaskMeta) {
        self.task_meta.write().unwrap().insert(url, meta);
    }

    pub fn len(&self) -> usize {
        self.task_meta.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_task_meta_is_visible_to_concurrent_readers() {
        let batch = Batch::new(
            "b1".into(),
            "j1".into(),
            JobParams::default(),
            vec!["http://example.com/p1".into()],
        );
        assert_eq!(batch.len(), 1);
        batch.set_task_meta(
            "http://example.com/p2".into(),
            TaskMeta { link_type: Some("product".into()), ..Default::default() },
        );
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.task_meta("http://example.com/p2").unwrap().link_type.as_deref(), Some("product"));
    }
}
