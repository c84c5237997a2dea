//! Domain-info resolution over HTTP. `resolve` (full `DomainInfo`) hits the
//! wrapper/site-config service; `resolve` on `PartialDomainInfoResolver`
//! (site + parent identifier only) hits the sites database — the lighter
//! sibling call the discovery dedup path needs.

use async_trait::async_trait;
use productcrawl_discovery::{PartialDomainInfo, PartialDomainInfoResolver};
use productcrawl_pipeline::DomainInfoResolver;
use productcrawl_types::{DomainInfo, JobParams};

pub struct HttpDomainInfoResolver {
    client: reqwest::Client,
    wrapper_service_uri: String,
    sitesdb_service_addr: String,
}

impl HttpDomainInfoResolver {
    pub fn new(wrapper_service_uri: impl Into<String>, sitesdb_service_addr: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            wrapper_service_uri: wrapper_service_uri.into(),
            sitesdb_service_addr: sitesdb_service_addr.into(),
        }
    }
}

#[async_trait]
impl DomainInfoResolver for HttpDomainInfoResolver {
    async fn resolve(&self, url: &str, job_type: &str, job_params: &JobParams) -> anyhow::Result<DomainInfo> {
        let resp = self
            .client
            .get(format!("{}/domain/info", self.wrapper_service_uri))
            .query(&[("url", url), ("job_type", job_type), ("job_id", job_params.job_id.as_str())])
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json::<DomainInfo>().await?)
    }
}

#[async_trait]
impl PartialDomainInfoResolver for HttpDomainInfoResolver {
    async fn resolve(&self, url: &str, job_type: &str) -> anyhow::Result<PartialDomainInfo> {
        let resp = self
            .client
            .get(format!("{}/domain/partial", self.sitesdb_service_addr))
            .query(&[("url", url), ("job_type", job_type)])
            .send()
            .await?
            .error_for_status()?;
        let body: PartialDomainInfoResponse = resp.json().await?;
        Ok(PartialDomainInfo { domain_name: body.domain_name, parent_identifier: body.parent_identifier })
    }
}

#[derive(serde::Deserialize)]
struct PartialDomainInfoResponse {
    domain_name: String,
    parent_identifier: String,
}
