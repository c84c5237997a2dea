//! The recrawl pipeline strategy: re-fetches a previously crawled URL
//! against its recorded extraction patterns.

use crate::context::PipelineContext;
use crate::strategy::{
    default_validate_web_response, rewrite_extraction_patterns, validate_domain_info_for_supervised, PipelineStrategy,
};
use async_trait::async_trait;
use productcrawl_sideeffects::run_recrawl_side_effects;
use productcrawl_types::{CrawlError, CrawlErrorCode, Workflow};

const ALLOWED_SITE_STATUS: &[&str] = &["ACTIVE", "RE_SORT"];
const CACHE_EXPIRY_SECS: i64 = 60 * 60;

pub struct RecrawlStrategy;

#[async_trait]
impl PipelineStrategy for RecrawlStrategy {
    fn name(&self) -> &'static str {
        "recrawl"
    }

    fn should_read_from_store(&self, _workflow: &Workflow) -> bool {
        true
    }

    fn validate_domain_info(&self, workflow: &Workflow) -> Result<(), CrawlError> {
        validate_domain_info_for_supervised(workflow, ALLOWED_SITE_STATUS)
    }

    fn validate_web_response(&self, workflow: &Workflow) -> Result<bool, CrawlError> {
        default_validate_web_response(workflow)
    }

    fn validate_extraction(&self, workflow: &mut Workflow) -> Result<(), CrawlError> {
        let web_success = workflow.web_response.as_ref().is_some_and(|w| w.is_success_status());
        if !web_success {
            return Ok(());
        }
        let is_product_url = workflow.domain_info.as_ref().is_some_and(|d| d.is_product_url);
        let site = workflow.domain_info.as_ref().map(|d| d.domain_name.as_str()).unwrap_or_default();
        if is_product_url && workflow.products.is_empty() && site != "amazon.com" {
            return Err(CrawlError::new(
                CrawlErrorCode::ExtractionFailedNoProds,
                format!("extraction returned 0 active prods for successful url {}", workflow.url),
            ));
        }
        Ok(())
    }

    fn cache_expiry_secs(&self) -> i64 {
        CACHE_EXPIRY_SECS
    }

    fn transform_error(&self, err: CrawlError) -> CrawlError {
        let err = rewrite_extraction_patterns(err);
        const RDSTORE_TIMEOUT: &str = "Client.Timeout exceeded while awaiting headers";
        match err.code.as_str() {
            "RDSTORE_READ_FAIL" if err.message.contains(RDSTORE_TIMEOUT) => err.rewrite(CrawlErrorCode::RdstoreReadTimeout),
            "RDSTORE_WRITE_FAILED" if err.message.contains(RDSTORE_TIMEOUT) => err.rewrite(CrawlErrorCode::RdstoreWriteTimeout),
            _ => err,
        }
    }

    fn should_post_ops_on_failure(&self, _workflow: &Workflow) -> bool {
        false
    }

    async fn post_crawl_ops(&self, _task: &str, workflow: &mut Workflow, ctx: &PipelineContext) -> Result<(), CrawlError> {
        if let Some(source) = &workflow.extraction_data_source {
            if source != "WRAPPER" {
                tracing::info!(source, "SKIPPING_RECRAWL_ACTIONS");
                return Ok(());
            }
        }

        run_recrawl_side_effects(workflow, ctx.rdstore_writer.as_ref(), ctx.raw_publisher.as_ref(), ctx.pp_publisher.as_ref())
            .await
            .map_err(|err| CrawlError::new(CrawlErrorCode::Other("RECRAWL_ACTIONS_FAILED"), err.to_string()))?;

        // Recrawl should never send extracted links as jobserver feedback.
        if let Some(extraction) = workflow.extraction.as_mut() {
            if !extraction.links.is_empty() {
                tracing::info!(count = extraction.links.len(), url = %workflow.url, "dropping links extracted during recrawl");
                extraction.links.clear();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use productcrawl_types::DomainInfo;

    fn workflow_with_status(status: &str) -> Workflow {
        let mut wf = Workflow::new("http://example.com/p1".into(), "recrawl".into(), Default::default(), 0);
        wf.domain_info = Some(DomainInfo {
            domain_name: "example.com".into(),
            site_status: status.into(),
            site_detail: Some(Default::default()),
            ..Default::default()
        });
        wf.job_params.data_sources = vec!["WRAPPER".into()];
        wf
    }

    #[test]
    fn rejects_sites_outside_allowed_status() {
        let strategy = RecrawlStrategy;
        let wf = workflow_with_status("PAUSE");
        let err = strategy.validate_domain_info(&wf).unwrap_err();
        assert_eq!(err.code, CrawlErrorCode::SiteStatusCheckFailed);
    }

    #[test]
    fn accepts_active_and_re_sort() {
        let strategy = RecrawlStrategy;
        assert!(strategy.validate_domain_info(&workflow_with_status("ACTIVE")).is_ok());
        assert!(strategy.validate_domain_info(&workflow_with_status("RE_SORT")).is_ok());
    }

    #[test]
    fn no_products_on_successful_product_url_fails() {
        let strategy = RecrawlStrategy;
        let mut wf = workflow_with_status("ACTIVE");
        wf.domain_info.as_mut().unwrap().is_product_url = true;
        wf.web_response = Some(productcrawl_types::WebResponse { status: 200, ..Default::default() });
        let err = strategy.validate_extraction(&mut wf).unwrap_err();
        assert_eq!(err.code, CrawlErrorCode::ExtractionFailedNoProds);
    }
}
