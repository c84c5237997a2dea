//! # productcrawl-events
//!
//! Queue publisher contract and the ETL/on-demand message shapes crawl
//! side effects publish.

pub mod etl;
pub mod messages;
pub mod publisher;

pub use etl::{publish_msgs_to_etl, EtlPublishCounts};
pub use messages::{build_msg_id, OnDemandResultMessage, RawEtlMessage};
pub use publisher::Publisher;
