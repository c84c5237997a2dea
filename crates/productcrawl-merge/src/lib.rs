//! # productcrawl-merge
//!
//! Multi-source orchestration and field-level merge: CASCADE
//! runs sources in order and stops at the first with data, MERGE_ALL runs
//! every source concurrently and always merges.

pub mod engine;
pub mod preference;

pub use engine::{merge, MergeMode, WRAPPER_SOURCE};
pub use preference::{default_merge_preference, is_empty_value, merge_product, MergePreference};
