//! Collaborator implementations backing `PipelineContext` and the REST/
//! worker surfaces: Redis and HTTP clients covering queueing, storage, and
//! PA-API integration.

pub mod amazon_http;
pub mod http_domain;
pub mod http_jobserver;
pub mod http_rdstore;
pub mod metrics_udp;
pub mod publisher;
pub mod redis_rpc;
pub mod redis_store;
pub mod rpc_clients;
