use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Local;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::instrument;

use crate::application::ports::{JobStore, JobStoreError};
use crate::domain::job_layout::{
    COMPLETE_MARKER, CONTIG_FILE, COUNTRY_FILE, ERROR_LOG, FORM_DATA_FILE, PIPELINE_ERROR_LOG,
};
use crate::domain::{JobId, JobState, Stage, SubmissionForm};

/// Directory-per-job store rooted at `anti_form_jobs/` (or wherever configured).
pub struct FsJobStore {
    root: PathBuf,
    sequences: Mutex<HashMap<String, u32>>,
}

impl FsJobStore {
    pub fn new(root: PathBuf) -> Result<Self, JobStoreError> {
        std::fs::create_dir_all(&root)?;
        let root = std::fs::canonicalize(&root)?;
        Ok(Self {
            root,
            sequences: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn existing_dir(&self, job_id: &JobId) -> Result<PathBuf, JobStoreError> {
        let dir = self.job_dir(job_id);
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(JobStoreError::NotFound(job_id.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(JobStoreError::NotFound(job_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Next daily sequence number. The first call for a date resumes after the
    /// highest sequence already on disk so restarts do not reuse numbers.
    async fn next_sequence(&self, date: &str) -> Result<u32, JobStoreError> {
        if let Some(seq) = self.bump_sequence(date, None) {
            return Ok(seq);
        }
        let on_disk = self.highest_sequence_on_disk(date).await?;
        let start = on_disk.map_or(1, |h| h + 1);
        Ok(self.bump_sequence(date, Some(start)).unwrap_or(start))
    }

    fn bump_sequence(&self, date: &str, start: Option<u32>) -> Option<u32> {
        let mut sequences = self
            .sequences
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = match start {
            Some(start) => sequences.entry(date.to_string()).or_insert(start),
            None => sequences.get_mut(date)?,
        };
        let current = *slot;
        *slot += 1;
        Some(current)
    }

    async fn highest_sequence_on_disk(&self, date: &str) -> Result<Option<u32>, JobStoreError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut highest = None;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Ok(job_id) = JobId::parse(name) else {
                continue;
            };
            if job_id.date() == date {
                highest = highest.max(Some(job_id.sequence()));
            }
        }
        Ok(highest)
    }

    async fn touch(&self, path: &Path) -> Result<(), JobStoreError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(())
    }

    async fn append(&self, path: &Path, message: &str) -> Result<(), JobStoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(message.as_bytes()).await?;
        if !message.ends_with('\n') {
            file.write_all(b"\n").await?;
        }
        file.flush().await?;
        Ok(())
    }
}

async fn is_file(path: &Path) -> Result<bool, JobStoreError> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn is_dir(path: &Path) -> Result<bool, JobStoreError> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn read_reason(path: &Path) -> Result<String, JobStoreError> {
    let content = fs::read(path).await?;
    Ok(String::from_utf8_lossy(&content).trim().to_string())
}

fn is_plain_relative(relative: &str) -> bool {
    let path = Path::new(relative);
    !relative.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[async_trait]
impl JobStore for FsJobStore {
    #[instrument(skip(self))]
    async fn create_job(&self) -> Result<JobId, JobStoreError> {
        let date = Local::now().format("%Y%m%d").to_string();
        loop {
            let sequence = self.next_sequence(&date).await?;
            let job_id = JobId::generate(&date, sequence);
            match fs::create_dir(self.job_dir(&job_id)).await {
                Ok(()) => {
                    tracing::debug!(job_id = %job_id, "Job directory created");
                    return Ok(job_id);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::warn!(job_id = %job_id, "Job id collision, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    #[instrument(skip(self, form), fields(job_id = %job_id))]
    async fn write_metadata(
        &self,
        job_id: &JobId,
        form: &SubmissionForm,
    ) -> Result<(), JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        let json = serde_json::to_vec_pretty(form)
            .map_err(|e| JobStoreError::Serialization(e.to_string()))?;
        fs::write(dir.join(FORM_DATA_FILE), json).await?;
        Ok(())
    }

    async fn read_metadata(&self, job_id: &JobId) -> Result<SubmissionForm, JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        let path = dir.join(FORM_DATA_FILE);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(JobStoreError::FileNotFound(FORM_DATA_FILE.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw).map_err(|e| JobStoreError::Serialization(e.to_string()))
    }

    #[instrument(skip(self, data), fields(job_id = %job_id, bytes = data.len()))]
    async fn write_assembly(&self, job_id: &JobId, data: &[u8]) -> Result<(), JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        fs::write(dir.join(CONTIG_FILE), data).await?;
        Ok(())
    }

    async fn prepare_stage_dir(
        &self,
        job_id: &JobId,
        stage: Stage,
    ) -> Result<PathBuf, JobStoreError> {
        let dir = self.existing_dir(job_id).await?.join(stage.output_dir());
        fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    async fn mark_stage_ok(&self, job_id: &JobId, stage: Stage) -> Result<(), JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        self.touch(&dir.join(stage.marker_file())).await
    }

    async fn stage_markers(&self, job_id: &JobId) -> Result<Vec<Stage>, JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        let mut present = Vec::new();
        for stage in Stage::ALL {
            if is_file(&dir.join(stage.marker_file())).await? {
                present.push(stage);
            }
        }
        Ok(present)
    }

    #[instrument(skip(self, message), fields(job_id = %job_id))]
    async fn append_error(&self, job_id: &JobId, message: &str) -> Result<(), JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        self.append(&dir.join(ERROR_LOG), message).await
    }

    #[instrument(skip(self, message), fields(job_id = %job_id))]
    async fn write_pipeline_error(
        &self,
        job_id: &JobId,
        message: &str,
    ) -> Result<(), JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        fs::write(dir.join(PIPELINE_ERROR_LOG), message).await?;
        Ok(())
    }

    async fn mark_complete(&self, job_id: &JobId) -> Result<(), JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        if is_file(&dir.join(ERROR_LOG)).await? {
            return Err(JobStoreError::AlreadyFailed(job_id.to_string()));
        }
        self.touch(&dir.join(COMPLETE_MARKER)).await
    }

    async fn write_country_placeholder(&self, job_id: &JobId) -> Result<(), JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        fs::write(dir.join(COUNTRY_FILE), b"").await?;
        Ok(())
    }

    async fn exists(&self, job_id: &JobId) -> Result<bool, JobStoreError> {
        is_dir(&self.job_dir(job_id)).await
    }

    async fn query_state(&self, job_id: &JobId) -> Result<JobState, JobStoreError> {
        let dir = self.existing_dir(job_id).await?;

        if is_file(&dir.join(COMPLETE_MARKER)).await? {
            return Ok(JobState::Done);
        }
        for log in [ERROR_LOG, PIPELINE_ERROR_LOG] {
            let path = dir.join(log);
            if is_file(&path).await? {
                return Ok(JobState::Failed(read_reason(&path).await?));
            }
        }
        for stage in Stage::ALL.into_iter().rev() {
            if is_dir(&dir.join(stage.output_dir())).await? {
                return Ok(JobState::Running(stage));
            }
        }
        Ok(JobState::Pending)
    }

    async fn list_files(&self, job_id: &JobId) -> Result<Vec<String>, JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        let mut files = Vec::new();
        let mut pending = vec![dir.clone()];

        while let Some(current) = pending.pop() {
            let mut entries = fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file()
                    && let Ok(relative) = path.strip_prefix(&dir)
                {
                    let parts: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    files.push(parts.join("/"));
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn resolve_file(
        &self,
        job_id: &JobId,
        relative: &str,
    ) -> Result<PathBuf, JobStoreError> {
        let dir = self.existing_dir(job_id).await?;
        if !is_plain_relative(relative) {
            return Err(JobStoreError::InvalidPath(relative.to_string()));
        }

        let candidate = dir.join(relative);
        let resolved = match fs::canonicalize(&candidate).await {
            Ok(p) => p,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(JobStoreError::FileNotFound(relative.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let base = fs::canonicalize(&dir).await?;
        if !resolved.starts_with(&base) {
            return Err(JobStoreError::InvalidPath(relative.to_string()));
        }
        if !is_file(&resolved).await? {
            return Err(JobStoreError::FileNotFound(relative.to_string()));
        }
        Ok(resolved)
    }

    fn job_dir(&self, job_id: &JobId) -> PathBuf {
        self.root.join(job_id.as_str())
    }
}
