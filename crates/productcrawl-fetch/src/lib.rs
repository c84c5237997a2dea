//! # productcrawl-fetch
//!
//! Proxy-service request construction, the HTTP client that talks to it, and
//! the cache-first retrying fetch loop.

pub mod loop_;
pub mod proxy_client;
pub mod request;

pub use loop_::{fetch_page, FetchLoopConfig};
pub use proxy_client::ProxyClient;
pub use request::{construct_payload, PayloadInputs, RequestPayload};
