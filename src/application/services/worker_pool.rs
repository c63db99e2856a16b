use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::Instrument;

use super::{JobQueue, PipelineOutcome, PipelineRunner};
use crate::application::ports::JobStore;
use crate::domain::JobId;

/// Fixed set of long-lived workers draining the [`JobQueue`].
///
/// Each worker runs one pipeline at a time on its own task, so at most
/// `size` pipelines execute concurrently. A pipeline that errors or panics
/// is recorded in that job's `pipeline_error.log` and the worker moves on.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    pub fn start(
        size: usize,
        queue: JobQueue,
        runner: Arc<PipelineRunner>,
        store: Arc<dyn JobStore>,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handles = (0..size)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    queue.clone(),
                    Arc::clone(&runner),
                    Arc::clone(&store),
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        tracing::info!(workers = size, "Analysis worker pool started");
        Self { handles, shutdown }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Stops taking new jobs and waits for in-flight pipelines to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task ended abnormally");
            }
        }
        tracing::info!("Analysis worker pool stopped");
    }
}

async fn worker_loop(
    worker: usize,
    queue: JobQueue,
    runner: Arc<PipelineRunner>,
    store: Arc<dyn JobStore>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::debug!(worker, "Analysis worker started");
    loop {
        let job_id = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            next = queue.dequeue() => match next {
                Some(job_id) => job_id,
                None => break,
            },
        };

        let span = tracing::info_span!("pipeline_job", job_id = %job_id, worker);
        process_job(job_id, &runner, store.as_ref())
            .instrument(span)
            .await;
    }
    tracing::debug!(worker, "Analysis worker stopped");
}

async fn process_job(job_id: JobId, runner: &Arc<PipelineRunner>, store: &dyn JobStore) {
    let task_runner = Arc::clone(runner);
    let task_job = job_id.clone();
    let handle = tokio::spawn(
        async move { task_runner.run(&task_job).await }.in_current_span(),
    );

    let failure = match handle.await {
        Ok(Ok(PipelineOutcome::Completed { .. })) => None,
        Ok(Ok(PipelineOutcome::Failed { step })) => {
            tracing::info!(step, "Job finished with a failed step");
            None
        }
        Ok(Err(e)) => Some(e.to_string()),
        Err(e) => Some(describe_join_error(e)),
    };

    if let Some(message) = failure {
        tracing::error!(error = %message, "Pipeline aborted unexpectedly");
        if let Err(e) = store.write_pipeline_error(&job_id, &message).await {
            tracing::error!(error = %e, "Failed to write pipeline_error.log");
        }
    }
}

fn describe_join_error(error: JoinError) -> String {
    if error.is_panic() {
        let payload = error.into_panic();
        if let Some(msg) = payload.downcast_ref::<&str>() {
            format!("pipeline panicked: {}", msg)
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            format!("pipeline panicked: {}", msg)
        } else {
            "pipeline panicked".to_string()
        }
    } else {
        format!("pipeline task cancelled: {}", error)
    }
}
