use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tracing::instrument;

use super::{JobQueue, QueueError};
use crate::application::ports::{JobStore, JobStoreError, ToolError, ToolInvocation, ToolRunner};
use crate::domain::{GcaCode, JobId, SubmissionForm, SubmissionFormError, validate_email};

pub struct UploadedAssembly {
    pub filename: String,
    pub data: Bytes,
}

#[derive(Default)]
pub struct SubmissionRequest {
    pub email: Option<String>,
    pub gca_code: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub assembly: Option<UploadedAssembly>,
}

#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub job_id: JobId,
    pub job_dir: PathBuf,
    pub form: SubmissionForm,
}

/// Accepts a job: validates the form, materialises the job directory with
/// its metadata and assembly, then hands the job to the queue.
pub struct SubmissionService {
    store: Arc<dyn JobStore>,
    tools: Arc<dyn ToolRunner>,
    queue: JobQueue,
    genome_download_script: PathBuf,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn JobStore>,
        tools: Arc<dyn ToolRunner>,
        queue: JobQueue,
        genome_download_script: PathBuf,
    ) -> Self {
        Self {
            store,
            tools,
            queue,
            genome_download_script,
        }
    }

    #[instrument(skip(self, request), fields(has_upload = request.assembly.is_some()))]
    pub async fn submit(
        &self,
        request: SubmissionRequest,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let email = non_blank(request.email.as_deref());
        if let Some(email) = email {
            validate_email(email)?;
        }
        let gca_code = non_blank(request.gca_code.as_deref())
            .map(GcaCode::parse)
            .transpose()?;
        if request.assembly.is_none() && gca_code.is_none() {
            return Err(SubmissionError::MissingAssembly);
        }

        let job_id = self.store.create_job().await?;
        let form = SubmissionForm::new(
            email,
            gca_code.as_ref(),
            request.assembly.as_ref().map(|a| a.filename.as_str()),
            non_blank(request.location.as_deref()),
            non_blank(request.country.as_deref()),
        );
        self.store.write_metadata(&job_id, &form).await?;

        match (&request.assembly, &gca_code) {
            (Some(assembly), _) => {
                self.store.write_assembly(&job_id, &assembly.data).await?;
            }
            (None, Some(code)) => self.download_genome(&job_id, code).await?,
            (None, None) => return Err(SubmissionError::MissingAssembly),
        }

        self.queue.enqueue(job_id.clone())?;
        tracing::info!(job_id = %job_id, queue_depth = self.queue.depth(), "Analysis job enqueued");

        Ok(SubmissionReceipt {
            job_dir: self.store.job_dir(&job_id),
            job_id,
            form,
        })
    }

    /// Fetches the assembly for `code` into the job directory. A failed
    /// download is also written to `error.log` so the job reads as failed.
    async fn download_genome(&self, job_id: &JobId, code: &GcaCode) -> Result<(), SubmissionError> {
        let invocation = ToolInvocation::new("perl")
            .arg(self.genome_download_script.to_string_lossy())
            .arg("-i")
            .arg(code.as_str())
            .option("-o", self.store.job_dir(job_id));

        match self.tools.run(&invocation).await {
            Ok(_) => {
                tracing::debug!(job_id = %job_id, gca_code = %code, "Genome downloaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, gca_code = %code, error = %e, "Genome download failed");
                let entry = format!("Genome download failed:\n{}\n", e);
                if let Err(store_err) = self.store.append_error(job_id, &entry).await {
                    tracing::error!(error = %store_err, "Failed to record download failure");
                }
                Err(SubmissionError::GenomeDownload(e))
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    InvalidForm(#[from] SubmissionFormError),
    #[error("either an assembly file or a GCA code is required")]
    MissingAssembly,
    #[error("Genome download failed: {0}")]
    GenomeDownload(#[source] ToolError),
    #[error("job store: {0}")]
    Store(#[from] JobStoreError),
    #[error(transparent)]
    Queue(#[from] QueueError),
}
