mod adapters;
mod composition;
mod executor;
mod modes;
mod rest;

use clap::Parser;
use productcrawl_config::{AppConfig, CliArgs, RunMode};
use std::net::SocketAddr;
use std::time::Duration;
use std::time::Instant;

const BIND_ADDR: &str = "0.0.0.0:4310";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = CliArgs::parse();
    let mode = args.run_mode()?;

    tracing::info!(env = %args.env, mode = ?mode, "WORKER_STARTING");

    let config = AppConfig::from_env()?;
    let ctx = composition::build_pipeline_context(&config)?;

    match mode {
        RunMode::Rest => run_rest_server(ctx).await,
        RunMode::JobServerWorker => {
            modes::run_job_server_worker(&config, ctx, args.worker_id.clone(), args.jobserver.clone(), shutdown_signal()).await
        }
        RunMode::QueueConsumer => modes::run_queue_consumer(&config, ctx, shutdown_signal()).await,
        RunMode::SingleUrlTest { url } => {
            let job_type = args.job_type.clone().unwrap_or_else(|| "wrapper".to_string());
            modes::run_single_url_test(ctx, job_type, url).await
        }
        RunMode::FileOfUrlsTest { file } => {
            let job_type = args.job_type.clone().unwrap_or_else(|| "wrapper".to_string());
            modes::run_file_of_urls_test(ctx, job_type, file).await
        }
    }
}

async fn run_rest_server(ctx: std::sync::Arc<productcrawl_pipeline::PipelineContext>) -> anyhow::Result<()> {
    let state = rest::AppState { ctx, started_at: Instant::now() };
    let app = rest::router(state);

    let addr: SocketAddr = BIND_ADDR.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "REST_SERVER_LISTENING");

    let (drain_tx, drain_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = drain_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = drain_tx.send(());
    tracing::info!(grace_secs = SHUTDOWN_GRACE.as_secs(), "REST_SERVER_DRAINING");

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("REST_SERVER_SHUTDOWN_COMPLETE"),
        Ok(Ok(Err(err))) => tracing::error!(%err, "REST_SERVER_ERROR"),
        Ok(Err(err)) => tracing::error!(%err, "REST_SERVER_TASK_PANICKED"),
        Err(_) => tracing::warn!("REST_SERVER_DRAIN_TIMED_OUT"),
    }
    Ok(())
}

/// Resolves as soon as Ctrl+C (or, on Unix, SIGTERM) arrives; callers decide
/// their own grace window afterward.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "CTRL_C_HANDLER_FAILED");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "SIGTERM_HANDLER_FAILED");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("SHUTDOWN_SIGNAL_RECEIVED (ctrl-c)"),
        _ = terminate => tracing::info!("SHUTDOWN_SIGNAL_RECEIVED (sigterm)"),
    }
}
