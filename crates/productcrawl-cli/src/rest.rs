//! HTTP surface: `POST /crawl/url`, `/crawl/url/simple`,
//! `/crawl/url/screenshot`, `/crawl/upload/content`, `/domain/info`, plus
//! the two admin endpoints. Listens on `:4310`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use productcrawl_cache::{construct_cache_id, write_cached_response, CacheKeyConfig};
use productcrawl_pipeline::{run_pipeline, strategy_for_job_type, PipelineContext};
use productcrawl_pool::{run_batch, SitePools, TaskResult, WorkflowExecutor};
use productcrawl_types::{DomainInfo, JobParams, WebResponse, Workflow};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::executor::PipelineWorkflowExecutor;

#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<PipelineContext>,
    pub started_at: Instant,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/crawl/url", post(crawl_url))
        .route("/crawl/url/simple", post(crawl_url_simple))
        .route("/crawl/url/screenshot", post(crawl_url_screenshot))
        .route("/crawl/upload/content", post(crawl_upload_content))
        .route("/domain/info", post(domain_info))
        .route("/admin/memstats", get(admin_memstats))
        .route("/health", get(health))
        .with_state(state)
}

struct RestError(anyhow::Error);

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        tracing::warn!(err = %self.0, "REST_REQUEST_FAILED");
        (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for RestError {
    fn from(err: E) -> Self {
        RestError(err.into())
    }
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

#[derive(Deserialize)]
struct CrawlUrlRequest {
    url: String,
    job_type: String,
    #[serde(default)]
    job_params: JobParams,
}

async fn crawl_url(State(state): State<AppState>, Json(body): Json<CrawlUrlRequest>) -> Result<Json<Workflow>, RestError> {
    let mut job_params = body.job_params;
    job_params.job_type = body.job_type.clone();
    let strategy = strategy_for_job_type(&body.job_type);
    let workflow = run_pipeline(&body.url, job_params, strategy.as_ref(), state.ctx.as_ref()).await;
    Ok(Json(workflow))
}

#[derive(Deserialize)]
struct CrawlUrlSimpleRequest {
    urls: Vec<String>,
    job_type: String,
    #[serde(default)]
    job_params: JobParams,
}

#[derive(Serialize)]
struct SimpleResult {
    status: bool,
    failure_type: Option<String>,
    failure_message: Option<String>,
}

impl From<TaskResult> for SimpleResult {
    fn from(r: TaskResult) -> Self {
        SimpleResult { status: r.status, failure_type: r.failure_type, failure_message: r.failure_message }
    }
}

async fn crawl_url_simple(
    State(state): State<AppState>,
    Json(body): Json<CrawlUrlSimpleRequest>,
) -> Result<Json<HashMap<String, SimpleResult>>, RestError> {
    let mut job_params = body.job_params;
    job_params.job_type = body.job_type;
    let executor: Arc<dyn WorkflowExecutor> = Arc::new(PipelineWorkflowExecutor::new(state.ctx.clone(), job_params));
    let site_pools = Arc::new(SitePools::new(HashMap::new()));
    let site_of: Arc<dyn Fn(&str) -> String + Send + Sync> =
        Arc::new(|url: &str| reqwest::Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string)).unwrap_or_default());

    let results = run_batch(body.urls, site_of, executor, site_pools, false, None).await;
    Ok(Json(results.into_iter().map(|(url, r)| (url, r.into())).collect()))
}

#[derive(Deserialize)]
struct CrawlUrlScreenshotRequest {
    url: String,
    job_type: String,
    #[serde(default)]
    job_params: JobParams,
}

#[derive(Serialize)]
struct ScreenshotResponse {
    success: bool,
    screenshot_path: Vec<String>,
    failure_type: Option<String>,
}

async fn crawl_url_screenshot(
    State(state): State<AppState>,
    Json(body): Json<CrawlUrlScreenshotRequest>,
) -> Result<Json<ScreenshotResponse>, RestError> {
    let mut job_params = body.job_params;
    job_params.job_type = body.job_type.clone();
    job_params.screenshot = 1;
    let strategy = strategy_for_job_type(&body.job_type);
    let workflow = run_pipeline(&body.url, job_params, strategy.as_ref(), state.ctx.as_ref()).await;
    let screenshot_path = workflow.web_response.as_ref().map(|r| r.screenshot_path.clone()).unwrap_or_default();
    Ok(Json(ScreenshotResponse { success: workflow.success, screenshot_path, failure_type: workflow.failure_type }))
}

#[derive(Deserialize)]
struct CrawlUploadContentRequest {
    url: String,
    domain: String,
    job_type: String,
    content: String,
    #[serde(default)]
    request_policy: String,
    #[serde(default)]
    cookie: String,
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Serialize)]
struct CrawlUploadContentResponse {
    cache_key: String,
}

async fn crawl_upload_content(
    State(state): State<AppState>,
    Json(body): Json<CrawlUploadContentRequest>,
) -> Result<Json<CrawlUploadContentResponse>, RestError> {
    let cache_cfg = CacheKeyConfig {
        url: body.url.clone(),
        domain: body.domain.clone(),
        headers: BTreeMap::new(),
        request_policy: body.request_policy,
        cookie: body.cookie,
        request_id: body.request_id,
    };
    let cache_key = construct_cache_id(productcrawl_cache::DEFAULT_FOLDER, &body.job_type, &body.domain, &cache_cfg);

    let response = WebResponse {
        status: 200,
        success: true,
        url: body.url,
        content: body.content,
        response_size: 0,
        ..Default::default()
    };
    write_cached_response(state.ctx.cache.as_ref(), &cache_key, &response, None, now_unix()).await?;
    Ok(Json(CrawlUploadContentResponse { cache_key }))
}

#[derive(Deserialize)]
struct DomainInfoRequest {
    url: String,
    job_type: String,
}

async fn domain_info(State(state): State<AppState>, Json(body): Json<DomainInfoRequest>) -> Result<Json<DomainInfo>, RestError> {
    let info = state.ctx.domain_info.resolve(&body.url, &body.job_type, &JobParams::default()).await?;
    Ok(Json(info))
}

#[derive(Serialize)]
struct MemStatsResponse {
    pid: u32,
    uptime_secs: u64,
    worker_threads: usize,
}

async fn admin_memstats(State(state): State<AppState>) -> Json<MemStatsResponse> {
    let metrics = tokio::runtime::Handle::current().metrics();
    Json(MemStatsResponse {
        pid: std::process::id(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        worker_threads: metrics.num_workers(),
    })
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
