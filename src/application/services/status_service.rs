use std::path::Path;
use std::sync::Arc;

use tracing::instrument;

use crate::application::ports::{JobStore, JobStoreError};
use crate::domain::job_layout::QUERY_TABLE;
use crate::domain::{JobId, JobState, Stage};

/// Extensions listed by [`StatusService::result_files`].
pub const RESULT_EXTENSIONS: [&str; 5] = ["tsv", "png", "pdf", "out", "html"];

#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Read-only view over the job directories. Knows nothing of the queue or
/// the workers; every answer comes from the marker files.
pub struct StatusService {
    store: Arc<dyn JobStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Malformed ids simply do not exist.
    pub async fn exists(&self, raw_job_id: &str) -> Result<bool, StatusError> {
        match JobId::parse(raw_job_id) {
            Ok(job_id) => Ok(self.store.exists(&job_id).await?),
            Err(_) => Ok(false),
        }
    }

    #[instrument(skip(self))]
    pub async fn status(&self, raw_job_id: &str) -> Result<JobState, StatusError> {
        let job_id = self.known_job(raw_job_id).await?;
        Ok(self.store.query_state(&job_id).await?)
    }

    pub async fn completed_stages(&self, raw_job_id: &str) -> Result<Vec<Stage>, StatusError> {
        let job_id = self.known_job(raw_job_id).await?;
        Ok(self.store.stage_markers(&job_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn result_files(&self, raw_job_id: &str) -> Result<Vec<String>, StatusError> {
        let job_id = self.completed_job(raw_job_id).await?;
        let files = self
            .store
            .list_files(&job_id)
            .await?
            .into_iter()
            .filter(|f| has_result_extension(f))
            .collect();
        Ok(files)
    }

    #[instrument(skip(self))]
    pub async fn download(
        &self,
        raw_job_id: &str,
        relative: &str,
    ) -> Result<DownloadedFile, StatusError> {
        let job_id = self.known_job(raw_job_id).await?;
        let path = self.store.resolve_file(&job_id, relative).await?;
        let bytes = tokio::fs::read(&path).await.map_err(JobStoreError::from)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| relative.to_string());
        Ok(DownloadedFile { filename, bytes })
    }

    /// Rows of `3.abProfilesCmp/query_table.tsv`, header first. Every row must
    /// have as many columns as the header.
    pub async fn query_table(&self, raw_job_id: &str) -> Result<Vec<Vec<String>>, StatusError> {
        let job_id = self.known_job(raw_job_id).await?;
        let relative = format!("{}/{}", Stage::AbProfilesCmp.output_dir(), QUERY_TABLE);
        let path = self.store.resolve_file(&job_id, &relative).await?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(JobStoreError::from)?;
        parse_uniform_table(&content, QUERY_TABLE)
    }

    async fn known_job(&self, raw_job_id: &str) -> Result<JobId, StatusError> {
        let job_id = JobId::parse(raw_job_id)
            .map_err(|_| StatusError::NotFound(raw_job_id.to_string()))?;
        if !self.store.exists(&job_id).await? {
            return Err(StatusError::NotFound(raw_job_id.to_string()));
        }
        Ok(job_id)
    }

    async fn completed_job(&self, raw_job_id: &str) -> Result<JobId, StatusError> {
        let job_id = self.known_job(raw_job_id).await?;
        match self.store.query_state(&job_id).await? {
            JobState::Done => Ok(job_id),
            _ => Err(StatusError::NotCompleted(raw_job_id.to_string())),
        }
    }
}

fn has_result_extension(relative: &str) -> bool {
    Path::new(relative)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| RESULT_EXTENSIONS.contains(&ext))
}

pub fn parse_uniform_table(content: &str, name: &str) -> Result<Vec<Vec<String>>, StatusError> {
    let mut lines = content.lines().peekable();
    let Some(header) = lines.peek() else {
        return Err(StatusError::MalformedTable(format!("{} is empty", name)));
    };
    let expected = header.split('\t').count();

    let mut table = Vec::new();
    for (index, line) in lines.enumerate() {
        let columns: Vec<String> = line.split('\t').map(str::to_string).collect();
        if columns.len() != expected {
            return Err(StatusError::MalformedTable(format!(
                "{} row {} has {} columns, expected {}",
                name,
                index + 1,
                columns.len(),
                expected
            )));
        }
        table.push(columns);
    }
    Ok(table)
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Job ID not found: {0}")]
    NotFound(String),
    #[error("job not completed yet: {0}")]
    NotCompleted(String),
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Invalid file path: {0}")]
    InvalidPath(String),
    #[error("{0}")]
    MalformedTable(String),
    #[error("job store: {0}")]
    Store(JobStoreError),
}

impl From<JobStoreError> for StatusError {
    fn from(error: JobStoreError) -> Self {
        match error {
            JobStoreError::NotFound(id) => StatusError::NotFound(id),
            JobStoreError::FileNotFound(path) => StatusError::FileNotFound(path),
            JobStoreError::InvalidPath(path) => StatusError::InvalidPath(path),
            other => StatusError::Store(other),
        }
    }
}
