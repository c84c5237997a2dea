//! # productcrawl-sideeffects
//!
//! Post-crawl side effects: variation splitting, KV-store
//! ("rdstore") update requests, recrawl ETL publish orchestration, and
//! discovery's document-store bulk write.

pub mod discovery_store;
pub mod rdstore;
pub mod recrawl;
pub mod variations;

pub use discovery_store::{bulk_write_discovery, DiscoveryWriteCounts, DocumentStoreWriter};
pub use rdstore::{build_rdstore_update_request, determine_skus_only, write_rdstore, RdstoreWriter};
pub use recrawl::run_recrawl_side_effects;
pub use variations::{construct_discontinued_child_sku, get_new_old_variations};
