//! `rdstore` write path over HTTP: a thin REST client for the
//! `rest_rdstoreupdate` service.

use async_trait::async_trait;
use productcrawl_sideeffects::RdstoreWriter;
use productcrawl_types::RdstoreUpdateRequest;

pub struct HttpRdstoreWriter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRdstoreWriter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[async_trait]
impl RdstoreWriter for HttpRdstoreWriter {
    async fn update(&self, request: &RdstoreUpdateRequest) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/rdstore/update", self.base_url))
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn mark_discontinued(&self, site: &str, parent_identifier: &str) -> anyhow::Result<()> {
        self.client
            .post(format!("{}/rdstore/discontinue", self.base_url))
            .query(&[("site", site), ("parent_identifier", parent_identifier)])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
