//! The crawl pipeline executor: the fixed eleven-step sequence shared by
//! every strategy.

use crate::context::PipelineContext;
use crate::strategy::PipelineStrategy;
use productcrawl_merge::{merge, MergeMode};
use productcrawl_translate::{apply_translation, should_translate_for_job};
use productcrawl_types::{CrawlError, CrawlErrorCode, JobParams, Workflow};
use std::time::{SystemTime, UNIX_EPOCH};

const WEBHOOKS_DOMAIN_SOURCE_MAP: &str = "webhooks_domain_source_map";
const REALTIME_DOMAIN_SOURCE_MAP: &str = "realtime_domain_source_map";

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Runs one URL through `strategy`'s eleven decision points. On any failure
/// `transform_error` rewrites the code before it's recorded on the
/// workflow; `should_call_post_crawl_ops_on_failure` decides whether
/// `post_crawl_ops` still runs (on-demand's async publish, for instance).
pub async fn run_pipeline(
    task: &str,
    job_params: JobParams,
    strategy: &dyn PipelineStrategy,
    ctx: &PipelineContext,
) -> Workflow {
    let crawl_timestamp = now_unix();
    let mut workflow = Workflow::new(String::new(), strategy.name().to_string(), job_params, crawl_timestamp);

    macro_rules! fail_and_return {
        ($code:expr, $msg:expr) => {{
            let err = strategy.transform_error(CrawlError::new($code, $msg));
            workflow.fail(&err);
            maybe_run_post_crawl_ops_on_failure(strategy, task, &mut workflow, ctx).await;
            return workflow;
        }};
    }

    // 3. preCrawlOps
    let outcome = match strategy.pre_crawl_ops(task, &mut workflow) {
        Ok(outcome) => outcome,
        Err(err) => {
            let err = strategy.transform_error(err);
            workflow.fail(&err);
            return workflow;
        }
    };
    workflow.url = outcome.url;

    // 4. domain info
    match ctx.domain_info.resolve(&workflow.url, strategy.name(), &workflow.job_params).await {
        Ok(info) => workflow.domain_info = Some(info),
        Err(err) => fail_and_return!(CrawlErrorCode::RetrieveDomainInfoFail, err.to_string()),
    }

    // 5. default data sources
    if workflow.job_params.data_sources.is_empty() {
        workflow.job_params.data_sources = default_data_sources(strategy.name(), &workflow, ctx).await;
    }

    // 6. validateDomainInfo
    if let Err(err) = strategy.validate_domain_info(&workflow) {
        fail_and_return!(err.code, err.message);
    }

    // 7. request id + product metrics skeleton
    if should_assign_request_id(strategy.name(), &workflow) {
        workflow.request_id = Some(format!("{}-{}", workflow.job_params.job_id, crawl_timestamp));
    }
    if let Some(info) = &workflow.domain_info {
        workflow.product_metrics.tags.site = info.domain_name.clone();
        workflow.product_metrics.tags.job_type = strategy.name().to_string();
    }

    // 8. rdstore preload
    if strategy.should_read_from_store(&workflow) {
        let is_product = workflow.domain_info.as_ref().is_some_and(|d| d.is_product_url);
        let parent_id = workflow
            .domain_info
            .as_ref()
            .and_then(|d| d.parent_identifier.clone())
            .filter(|p| !p.is_empty());
        if is_product {
            if let Some(parent_id) = parent_id {
                let site = workflow.domain_info.as_ref().unwrap().domain_name.clone();
                match ctx.kv_store.fetch(&site, &parent_id).await {
                    Ok(Some(record)) => workflow.kv_record = Some(record),
                    Ok(None) if strategy.name() == "recrawl" => {
                        fail_and_return!(CrawlErrorCode::RdstoreDataMissingEarly, format!("no rdstore record for {parent_id}"));
                    }
                    Ok(None) => {}
                    Err(err) => fail_and_return!(CrawlErrorCode::Other("RDSTORE_READ_FAIL"), err.to_string()),
                }
            }
        }
    }

    // cache key, if this strategy reads/writes cache
    if let Err(err) = prepare_and_run_merge(strategy, &mut workflow, ctx).await {
        fail_and_return!(err.code, err.message);
    }

    workflow.succeed();

    // 10. translation
    if should_translate_for_job(&workflow) {
        if let Err(err) = apply_translation(&mut workflow, ctx.skus_store.as_ref(), ctx.translate_rpc.as_ref(), ctx.counters.as_ref()).await {
            fail_and_return!(err.code, err.message);
        }
    }

    // 11. postCrawlOps
    workflow.flags.post_ops_called = true;
    if let Err(err) = strategy.post_crawl_ops(task, &mut workflow, ctx).await {
        let err = strategy.transform_error(err);
        workflow.fail(&err);
    }

    workflow
}

async fn maybe_run_post_crawl_ops_on_failure(strategy: &dyn PipelineStrategy, task: &str, workflow: &mut Workflow, ctx: &PipelineContext) {
    if !strategy.should_post_ops_on_failure(workflow) {
        return;
    }
    workflow.flags.post_ops_called = true;
    let _ = strategy.post_crawl_ops(task, workflow, ctx).await;
}

fn should_assign_request_id(strategy_name: &str, workflow: &Workflow) -> bool {
    strategy_name == "recrawl" || (strategy_name == "realtime" && workflow.job_params.disable_cache)
}

async fn default_data_sources(strategy_name: &str, workflow: &Workflow, ctx: &PipelineContext) -> Vec<String> {
    let hash_key = match strategy_name {
        n if n.contains("webhooks") => Some(WEBHOOKS_DOMAIN_SOURCE_MAP),
        "realtime" => Some(REALTIME_DOMAIN_SOURCE_MAP),
        _ => None,
    };
    let Some(hash_key) = hash_key else {
        return vec!["WRAPPER".to_string()];
    };
    let site = workflow.domain_info.as_ref().map(|d| d.domain_name.as_str()).unwrap_or_default();
    if let Ok(Some(sources)) = ctx.data_source_map.get(hash_key, site).await {
        if !sources.is_empty() {
            return sources;
        }
    }
    if let Ok(Some(sources)) = ctx.data_source_map.get(hash_key, "default").await {
        if !sources.is_empty() {
            return sources;
        }
    }
    vec!["WRAPPER".to_string()]
}

/// Step 9: run the merge engine across every configured source. Each
/// source's own `request()` owns its fetch (cache read/write, retry) and
/// decides whether it has anything worth extracting; nothing here gates
/// that on a separate top-level fetch. Once merge settles `workflow.products`
/// and `workflow.web_response`, the strategy's own response/extraction
/// checks run against whatever the sources actually produced.
async fn prepare_and_run_merge(strategy: &dyn PipelineStrategy, workflow: &mut Workflow, ctx: &PipelineContext) -> Result<(), CrawlError> {
    let mode = MergeMode::from_job_param(workflow.job_params.merge_mode.as_deref());
    let preference = workflow.job_params.merge_preference.clone();
    let url = workflow.url.clone();
    merge(&ctx.sources, mode, &url, workflow, preference.as_ref()).await?;

    let can_extract = strategy.validate_web_response(workflow)?;
    if can_extract {
        workflow.dedup_products_by_id();
    }

    strategy.validate_extraction(workflow)
}
