use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use super::error::error_response;
use crate::application::services::{SubmissionError, SubmissionRequest, UploadedAssembly};
use crate::presentation::state::AppState;

#[derive(Serialize)]
pub struct SubmitJobResponse {
    pub email: String,
    #[serde(rename = "gcaCode")]
    pub gca_code: String,
    pub location: String,
    pub job_id: String,
    pub file_saved_path: String,
    pub message: String,
}

#[tracing::instrument(skip(state, multipart))]
pub async fn submit_job_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut request = SubmissionRequest::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(f)) => f,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read multipart");
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read multipart: {}", e),
                );
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let data = match field.bytes().await {
                Ok(d) => d,
                Err(e) => {
                    return error_response(
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read file: {}", e),
                    );
                }
            };
            // Browsers send an empty part when no file was picked.
            if filename.is_empty() && data.is_empty() {
                continue;
            }
            tracing::debug!(filename = %filename, bytes = data.len(), "Assembly uploaded");
            request.assembly = Some(UploadedAssembly { filename, data });
            continue;
        }

        let value = match field.text().await {
            Ok(v) => v,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read field {}: {}", name, e),
                );
            }
        };
        match name.as_str() {
            "email" => request.email = Some(value),
            "gcaCode" => request.gca_code = Some(value),
            "location" => request.location = Some(value),
            "country" => request.country = Some(value),
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }

    match state.submission_service.submit(request).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(SubmitJobResponse {
                email: receipt.form.email,
                gca_code: receipt.form.gca_code,
                location: receipt.form.location,
                job_id: receipt.job_id.to_string(),
                file_saved_path: receipt.job_dir.to_string_lossy().into_owned(),
                message: "Job submitted successfully".to_string(),
            }),
        )
            .into_response(),
        Err(e @ (SubmissionError::InvalidForm(_) | SubmissionError::MissingAssembly)) => {
            tracing::warn!(error = %e, "Rejected submission");
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e @ SubmissionError::Queue(_)) => {
            tracing::error!(error = %e, "Failed to enqueue job");
            error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        }
        Err(e) => {
            tracing::error!(error = %e, "Submission failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
