use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::services::StatusError;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        let status = match &self {
            StatusError::NotFound(_) | StatusError::FileNotFound(_) => StatusCode::NOT_FOUND,
            StatusError::NotCompleted(_) => StatusCode::PAYMENT_REQUIRED,
            StatusError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            StatusError::MalformedTable(_) | StatusError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Job lookup failed");
        }
        error_response(status, self.to_string())
    }
}
