//! ETL and on-demand message shapes published after a crawl.

use productcrawl_types::AttrMap;
use serde::{Deserialize, Serialize};

/// `msg_id = job_id;site;parent_id`, the message-queue dedup key.
pub fn build_msg_id(job_id: &str, site: &str, parent_identifier: &str) -> String {
    format!("{job_id};{site};{parent_identifier}")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEtlMessage {
    pub msg_id: String,
    pub data: AttrMap,
    pub proxy: i32,
    pub frequency: String,
    pub extraction_mode: String,
    pub domain_name: String,
    pub is_active: bool,
    pub page_discontinued: bool,
    #[serde(default)]
    pub force_download_image: bool,
    pub force_download_image_size: Option<i32>,
    pub min_valid_image_size: Option<i32>,
    #[serde(default)]
    pub allow_html_image_source: bool,
    pub skus_only: bool,
}

/// Result line for an on-demand batch, keyed by the request's position in
/// the input file/URL list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnDemandResultMessage {
    pub request_line: usize,
    pub url: String,
    pub success: bool,
    pub products: Vec<AttrMap>,
    pub failure_type: Option<String>,
    pub failure_message: Option<String>,
}
