use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{JobId, JobState, Stage, SubmissionForm};

/// Persistent per-job state. The directory contents are the source of truth;
/// implementations keep no job registry of their own.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Allocates a fresh identifier and an empty job directory.
    async fn create_job(&self) -> Result<JobId, JobStoreError>;

    async fn write_metadata(
        &self,
        job_id: &JobId,
        form: &SubmissionForm,
    ) -> Result<(), JobStoreError>;

    async fn read_metadata(&self, job_id: &JobId) -> Result<SubmissionForm, JobStoreError>;

    async fn write_assembly(&self, job_id: &JobId, data: &[u8]) -> Result<(), JobStoreError>;

    /// Creates (if needed) and returns the stage's output directory.
    async fn prepare_stage_dir(&self, job_id: &JobId, stage: Stage)
    -> Result<PathBuf, JobStoreError>;

    async fn mark_stage_ok(&self, job_id: &JobId, stage: Stage) -> Result<(), JobStoreError>;

    async fn stage_markers(&self, job_id: &JobId) -> Result<Vec<Stage>, JobStoreError>;

    async fn append_error(&self, job_id: &JobId, message: &str) -> Result<(), JobStoreError>;

    async fn write_pipeline_error(
        &self,
        job_id: &JobId,
        message: &str,
    ) -> Result<(), JobStoreError>;

    /// Refuses with [`JobStoreError::AlreadyFailed`] when `error.log` exists.
    async fn mark_complete(&self, job_id: &JobId) -> Result<(), JobStoreError>;

    async fn write_country_placeholder(&self, job_id: &JobId) -> Result<(), JobStoreError>;

    async fn exists(&self, job_id: &JobId) -> Result<bool, JobStoreError>;

    async fn query_state(&self, job_id: &JobId) -> Result<JobState, JobStoreError>;

    /// Every regular file under the job directory, relative, `/`-separated, sorted.
    async fn list_files(&self, job_id: &JobId) -> Result<Vec<String>, JobStoreError>;

    /// Resolves `relative` to an existing file inside the job directory.
    async fn resolve_file(&self, job_id: &JobId, relative: &str)
    -> Result<PathBuf, JobStoreError>;

    fn job_dir(&self, job_id: &JobId) -> PathBuf;
}

#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("path escapes job directory: {0}")]
    InvalidPath(String),
    #[error("job already failed: {0}")]
    AlreadyFailed(String),
    #[error("serialization failed: {0}")]
    Serialization(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
