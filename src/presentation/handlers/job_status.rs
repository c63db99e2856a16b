use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::domain::JobState;
use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct JobStatusResponse {
    pub status: String,
    pub job_id: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct JobExistsResponse {
    pub exists: bool,
}

#[tracing::instrument(skip(state))]
pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.status_service.status(&job_id).await {
        Ok(job_state) => {
            let status = match &job_state {
                JobState::Done => "done",
                JobState::Failed(_) => "failed",
                JobState::Pending | JobState::Running(_) => "running",
            };
            let response = JobStatusResponse {
                status: status.to_string(),
                job_id,
                state: job_state.as_str().to_string(),
                stage: job_state.stage().map(|s| s.as_str().to_string()),
                error: job_state.failure_reason().map(str::to_string),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

pub async fn check_job_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.status_service.exists(&job_id).await {
        Ok(exists) => (StatusCode::OK, Json(JobExistsResponse { exists })).into_response(),
        Err(e) => e.into_response(),
    }
}
