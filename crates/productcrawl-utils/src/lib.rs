//! # productcrawl-utils
//!
//! URL/task classification, cache-key derivation, and the chunked batch
//! helper shared by the discovery and merge components.

pub mod batch_process;
pub mod cache_key;
pub mod task;
pub mod url;

pub use batch_process::batch_process_items;
pub use cache_key::{construct_cache_id, CacheKeyConfig};
pub use task::{format_task, is_url, parse_task, ParsedTask};
pub use url::{is_product_url, is_sitemap_url, LinkClass};
