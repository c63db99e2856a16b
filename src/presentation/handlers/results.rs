use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::Serialize;

use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct ResultFilesResponse {
    pub job_id: String,
    pub files: Vec<String>,
}

#[derive(Serialize)]
pub struct QueryTableResponse {
    pub job_id: String,
    pub rows: Vec<Vec<String>>,
}

#[tracing::instrument(skip(state))]
pub async fn result_files_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.status_service.result_files(&job_id).await {
        Ok(files) => (StatusCode::OK, Json(ResultFilesResponse { job_id, files })).into_response(),
        Err(e) => e.into_response(),
    }
}

#[tracing::instrument(skip(state))]
pub async fn download_handler(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.status_service.download(&job_id, &filename).await {
        Ok(file) => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                file.filename.replace('"', "")
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                file.bytes,
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

#[tracing::instrument(skip(state))]
pub async fn query_table_handler(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.status_service.query_table(&job_id).await {
        Ok(rows) => (StatusCode::OK, Json(QueryTableResponse { job_id, rows })).into_response(),
        Err(e) => e.into_response(),
    }
}
