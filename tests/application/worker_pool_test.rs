use std::sync::Arc;
use std::time::Duration;

use amr_backend::application::ports::{JobStore, ToolError};
use amr_backend::application::services::{JobQueue, PipelineRunner, TAX_ASSIGN_TOOL, WorkerPool};
use amr_backend::domain::job_layout::{COMPLETE_MARKER, ERROR_LOG, PIPELINE_ERROR_LOG};
use amr_backend::domain::{JobId, JobState};
use amr_backend::infrastructure::process::MockToolRunner;
use amr_backend::infrastructure::storage::FsJobStore;

use crate::helpers::{job_with_assembly, pipeline_config, test_store, writes};

const POOL_SIZE: usize = 3;

async fn wait_for_terminal(store: &FsJobStore, job_id: &JobId) -> JobState {
    for _ in 0..500 {
        let state = store.query_state(job_id).await.unwrap();
        if state.is_terminal() {
            return state;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish", job_id);
}

fn start_pool(store: &Arc<FsJobStore>, tools: Arc<MockToolRunner>, queue: &JobQueue) -> WorkerPool {
    let runner = Arc::new(PipelineRunner::new(
        store.clone(),
        tools,
        pipeline_config(),
    ));
    WorkerPool::start(POOL_SIZE, queue.clone(), runner, store.clone())
}

#[tokio::test]
async fn given_more_jobs_than_workers_when_processing_then_concurrency_bounded_by_pool() {
    let (_dir, store) = test_store();
    let tools = Arc::new(MockToolRunner::scaffold().with_delay(Duration::from_millis(30)));
    let queue = JobQueue::new();
    let pool = start_pool(&store, tools.clone(), &queue);

    let mut jobs = Vec::new();
    for _ in 0..8 {
        let job_id = job_with_assembly(&store).await;
        queue.enqueue(job_id.clone()).unwrap();
        jobs.push(job_id);
    }

    for job_id in &jobs {
        assert_eq!(wait_for_terminal(&store, job_id).await, JobState::Done);
    }
    assert!(tools.max_concurrency() <= POOL_SIZE);
    assert!(tools.max_concurrency() >= 2);
    assert_eq!(queue.depth(), 0);

    pool.shutdown().await;
}

#[tokio::test]
async fn given_one_failing_job_when_processing_then_other_job_still_completes() {
    let (_dir, store) = test_store();
    let doomed = job_with_assembly(&store).await;
    let healthy = job_with_assembly(&store).await;

    let doomed_id = doomed.to_string();
    let tax_ok = writes("taxAssign.result", "Klebsiella_pneumoniae\t99.0\n");
    let tools = Arc::new(MockToolRunner::scaffold().on(TAX_ASSIGN_TOOL, move |inv| {
        if inv.value_of("-i").is_some_and(|p| p.contains(&doomed_id)) {
            return Err(ToolError::Failed {
                program: inv.program.clone(),
                code: Some(2),
                stderr: "corrupt assembly".to_string(),
            });
        }
        tax_ok(inv)
    }));
    let queue = JobQueue::new();
    let pool = start_pool(&store, tools, &queue);

    queue.enqueue(doomed.clone()).unwrap();
    queue.enqueue(healthy.clone()).unwrap();

    assert!(matches!(
        wait_for_terminal(&store, &doomed).await,
        JobState::Failed(_)
    ));
    assert_eq!(wait_for_terminal(&store, &healthy).await, JobState::Done);
    assert!(store.job_dir(&doomed).join(ERROR_LOG).is_file());
    assert!(!store.job_dir(&doomed).join(COMPLETE_MARKER).exists());
    assert!(!store.job_dir(&healthy).join(ERROR_LOG).exists());

    pool.shutdown().await;
}

#[tokio::test]
async fn given_pipeline_panics_when_processing_then_pipeline_error_recorded_and_worker_survives() {
    let (_dir, store) = test_store();
    let exploding = job_with_assembly(&store).await;
    let after = job_with_assembly(&store).await;

    let exploding_id = exploding.to_string();
    let tax_ok = writes("taxAssign.result", "Staphylococcus_aureus\t99.0\n");
    let tools = Arc::new(MockToolRunner::scaffold().on(TAX_ASSIGN_TOOL, move |inv| {
        if inv.value_of("-i").is_some_and(|p| p.contains(&exploding_id)) {
            panic!("tool exploded");
        }
        tax_ok(inv)
    }));
    let queue = JobQueue::new();
    let runner = Arc::new(PipelineRunner::new(
        store.clone(),
        tools,
        pipeline_config(),
    ));
    let pool = WorkerPool::start(1, queue.clone(), runner, store.clone());

    queue.enqueue(exploding.clone()).unwrap();
    queue.enqueue(after.clone()).unwrap();

    match wait_for_terminal(&store, &exploding).await {
        JobState::Failed(reason) => assert!(reason.contains("tool exploded")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(store.job_dir(&exploding).join(PIPELINE_ERROR_LOG).is_file());
    assert_eq!(wait_for_terminal(&store, &after).await, JobState::Done);

    pool.shutdown().await;
}

#[tokio::test]
async fn given_idle_pool_when_shutting_down_then_workers_stop() {
    let (_dir, store) = test_store();
    let queue = JobQueue::new();
    let pool = start_pool(&store, Arc::new(MockToolRunner::new()), &queue);

    assert_eq!(pool.size(), POOL_SIZE);
    tokio::time::timeout(Duration::from_secs(2), pool.shutdown())
        .await
        .unwrap();
}
