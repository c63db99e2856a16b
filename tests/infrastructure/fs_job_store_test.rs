use amr_backend::application::ports::{JobStore, JobStoreError};
use amr_backend::domain::job_layout::{COMPLETE_MARKER, ERROR_LOG, FORM_DATA_FILE};
use amr_backend::domain::{JobId, JobState, Stage, SubmissionForm};
use amr_backend::infrastructure::storage::FsJobStore;

use crate::helpers::test_store;

#[tokio::test]
async fn given_store_when_creating_jobs_then_directories_exist_with_today_prefix() {
    let (_dir, store) = test_store();
    let today = chrono::Local::now().format("%Y%m%d").to_string();

    let first = store.create_job().await.unwrap();
    let second = store.create_job().await.unwrap();

    assert!(store.job_dir(&first).is_dir());
    assert_ne!(first, second);
    assert_eq!(first.date(), today);
    assert_eq!(second.sequence(), (first.sequence() + 1) % 100);
}

#[tokio::test]
async fn given_existing_jobs_on_disk_when_store_restarts_then_sequence_resumes() {
    let (dir, store) = test_store();
    let first = store.create_job().await.unwrap();
    drop(store);

    let reopened = FsJobStore::new(dir.path().join("anti_form_jobs")).unwrap();
    let next = reopened.create_job().await.unwrap();

    assert_eq!(next.sequence(), (first.sequence() + 1) % 100);
}

#[tokio::test]
async fn given_form_when_writing_metadata_then_read_back_equal() {
    let (_dir, store) = test_store();
    let job_id = store.create_job().await.unwrap();
    let form = SubmissionForm::new(Some("a@b.co"), None, Some("x.fa"), Some("lab"), None);

    store.write_metadata(&job_id, &form).await.unwrap();

    assert!(store.job_dir(&job_id).join(FORM_DATA_FILE).is_file());
    assert_eq!(store.read_metadata(&job_id).await.unwrap(), form);
}

#[tokio::test]
async fn given_unknown_job_when_writing_then_not_found() {
    let (_dir, store) = test_store();
    let ghost = JobId::generate("20000101", 1);

    let result = store.write_assembly(&ghost, b">x\nA\n").await;

    assert!(matches!(result, Err(JobStoreError::NotFound(_))));
    assert!(!store.exists(&ghost).await.unwrap());
}

#[tokio::test]
async fn given_stage_marker_written_twice_when_listing_then_present_once() {
    let (_dir, store) = test_store();
    let job_id = store.create_job().await.unwrap();

    store.mark_stage_ok(&job_id, Stage::TaxAssign).await.unwrap();
    store.mark_stage_ok(&job_id, Stage::TaxAssign).await.unwrap();
    store.mark_stage_ok(&job_id, Stage::QueryProfile).await.unwrap();

    assert_eq!(
        store.stage_markers(&job_id).await.unwrap(),
        vec![Stage::TaxAssign, Stage::QueryProfile]
    );
}

#[tokio::test]
async fn given_job_progress_when_querying_state_then_derived_from_markers() {
    let (_dir, store) = test_store();
    let job_id = store.create_job().await.unwrap();
    assert_eq!(store.query_state(&job_id).await.unwrap(), JobState::Pending);

    store
        .prepare_stage_dir(&job_id, Stage::TaxAssign)
        .await
        .unwrap();
    store
        .prepare_stage_dir(&job_id, Stage::AbProfilesCmp)
        .await
        .unwrap();
    assert_eq!(
        store.query_state(&job_id).await.unwrap(),
        JobState::Running(Stage::AbProfilesCmp)
    );

    store.mark_complete(&job_id).await.unwrap();
    assert_eq!(store.query_state(&job_id).await.unwrap(), JobState::Done);
}

#[tokio::test]
async fn given_error_logged_when_marking_complete_then_refused() {
    let (_dir, store) = test_store();
    let job_id = store.create_job().await.unwrap();
    store
        .append_error(&job_id, "Taxonomic Assignment failed:\nboom")
        .await
        .unwrap();

    let result = store.mark_complete(&job_id).await;

    assert!(matches!(result, Err(JobStoreError::AlreadyFailed(_))));
    assert!(!store.job_dir(&job_id).join(COMPLETE_MARKER).exists());
    match store.query_state(&job_id).await.unwrap() {
        JobState::Failed(reason) => assert!(reason.contains("Taxonomic Assignment failed")),
        other => panic!("expected failed, got {:?}", other),
    }
}

#[tokio::test]
async fn given_two_errors_when_appending_then_both_kept_in_order() {
    let (_dir, store) = test_store();
    let job_id = store.create_job().await.unwrap();

    store.append_error(&job_id, "first").await.unwrap();
    store.append_error(&job_id, "second\n").await.unwrap();

    let log = std::fs::read_to_string(store.job_dir(&job_id).join(ERROR_LOG)).unwrap();
    assert_eq!(log, "first\nsecond\n");
}

#[tokio::test]
async fn given_pipeline_error_when_querying_state_then_failed() {
    let (_dir, store) = test_store();
    let job_id = store.create_job().await.unwrap();

    store
        .write_pipeline_error(&job_id, "pipeline panicked: boom")
        .await
        .unwrap();

    assert_eq!(
        store.query_state(&job_id).await.unwrap(),
        JobState::Failed("pipeline panicked: boom".to_string())
    );
}

#[tokio::test]
async fn given_nested_outputs_when_listing_files_then_relative_and_sorted() {
    let (_dir, store) = test_store();
    let job_id = store.create_job().await.unwrap();
    let ab_dir = store
        .prepare_stage_dir(&job_id, Stage::AbProfilesCmp)
        .await
        .unwrap();
    std::fs::write(ab_dir.join("hits_table.tsv"), "a\tb\n").unwrap();
    store.write_assembly(&job_id, b">x\nA\n").await.unwrap();

    let files = store.list_files(&job_id).await.unwrap();

    assert_eq!(files, vec!["3.abProfilesCmp/hits_table.tsv", "contigFile.fa"]);
}

#[tokio::test]
async fn given_escaping_paths_when_resolving_then_invalid_path() {
    let (_dir, store) = test_store();
    let job_id = store.create_job().await.unwrap();

    for relative in ["../secret.txt", "/etc/passwd", "3.abProfilesCmp/../../x", ""] {
        let result = store.resolve_file(&job_id, relative).await;
        assert!(
            matches!(result, Err(JobStoreError::InvalidPath(_))),
            "{:?} gave {:?}",
            relative,
            result
        );
    }
}

#[tokio::test]
async fn given_missing_file_when_resolving_then_file_not_found() {
    let (_dir, store) = test_store();
    let job_id = store.create_job().await.unwrap();

    let result = store.resolve_file(&job_id, "nope.tsv").await;

    assert!(matches!(result, Err(JobStoreError::FileNotFound(_))));
}
