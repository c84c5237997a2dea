//! `WorkflowExecutor` bridging the batch worker pool to the pipeline's
//! single fixed entrypoint (`run_pipeline`), resolving which strategy to run
//! once per batch rather than once per URL since every task in a batch
//! shares a job type.
//!
//! Feedback links discovery computes (`filter_job_server_feedback_links`)
//! are already pushed to the job server or folded into spidering history as
//! a side effect inside each strategy's `post_crawl_ops`; `TaskResult.feedback`
//! is left empty here rather than re-deriving the same map a second time.

use async_trait::async_trait;
use productcrawl_pipeline::{run_pipeline, strategy_for_job_type, PipelineContext};
use productcrawl_pool::{log_product_metrics, TaskResult, WorkflowExecutor};
use productcrawl_types::JobParams;
use std::sync::Arc;

pub struct PipelineWorkflowExecutor {
    ctx: Arc<PipelineContext>,
    job_params: JobParams,
}

impl PipelineWorkflowExecutor {
    pub fn new(ctx: Arc<PipelineContext>, job_params: JobParams) -> Self {
        Self { ctx, job_params }
    }
}

#[async_trait]
impl WorkflowExecutor for PipelineWorkflowExecutor {
    async fn execute(&self, url: &str) -> TaskResult {
        let strategy = strategy_for_job_type(&self.job_params.job_type);
        let workflow = run_pipeline(url, self.job_params.clone(), strategy.as_ref(), self.ctx.as_ref()).await;
        log_product_metrics(url, &workflow.product_metrics);

        TaskResult {
            status: workflow.success,
            failure_type: workflow.failure_type,
            failure_message: workflow.failure_message,
            feedback: None,
        }
    }
}
