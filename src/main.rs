use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use amr_backend::application::ports::{JobStore, ToolRunner};
use amr_backend::application::services::{
    JobQueue, PipelineRunner, StatusService, SubmissionService, WorkerPool,
};
use amr_backend::infrastructure::observability::{TracingConfig, init_tracing};
use amr_backend::infrastructure::process::{MockToolRunner, ProcessToolRunner};
use amr_backend::infrastructure::storage::FsJobStore;
use amr_backend::presentation::{AppState, Environment, ScaffoldConfig, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(&TracingConfig::from_settings(&settings.logging, environment));

    let store: Arc<dyn JobStore> = Arc::new(
        FsJobStore::new(PathBuf::from(&settings.storage.jobs_root))
            .context("Failed to open jobs root")?,
    );
    tracing::info!(jobs_root = %settings.storage.jobs_root, "Job store ready");

    let scaffold_config = ScaffoldConfig::default();
    let tools: Arc<dyn ToolRunner> = if scaffold_config.enabled {
        tracing::warn!("Scaffold mode enabled, pipeline tools are stubbed");
        let mock = MockToolRunner::scaffold();
        match scaffold_config.tool_delay() {
            Some(delay) => Arc::new(mock.with_delay(delay)),
            None => Arc::new(mock),
        }
    } else {
        Arc::new(ProcessToolRunner::new(
            settings.pipeline.search_dirs(),
            settings.pipeline.tool_timeout(),
        ))
    };

    let runner = Arc::new(PipelineRunner::new(
        Arc::clone(&store),
        Arc::clone(&tools),
        (&settings.pipeline).into(),
    ));

    let queue = JobQueue::new();
    let pool = WorkerPool::start(
        settings.workers.count,
        queue.clone(),
        runner,
        Arc::clone(&store),
    );

    let submission_service = Arc::new(SubmissionService::new(
        Arc::clone(&store),
        tools,
        queue.clone(),
        PathBuf::from(&settings.pipeline.genome_download_script),
    ));
    let status_service = Arc::new(StatusService::new(store));

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = AppState {
        submission_service,
        status_service,
        queue,
        worker_count: pool.size(),
        settings,
    };

    let router = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped, draining workers");
    pool.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
