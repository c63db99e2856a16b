use axum::Router;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Request};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::presentation::handlers::{
    check_job_handler, download_handler, health_handler, job_status_handler, query_table_handler,
    result_files_handler, submit_job_handler,
};
use crate::presentation::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn create_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let body_limit = state.settings.storage.max_upload_size_bytes;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/health", get(health_handler))
        .route("/submitjob/upload", post(submit_job_handler))
        .route("/submitjob/status/{job_id}", get(job_status_handler))
        .route("/submitjob/result/{job_id}", get(result_files_handler))
        .route("/submitjob/download/{job_id}/{*filename}", get(download_handler))
        .route("/search/check_jobid/{job_id}", get(check_job_handler))
        .route("/result/query_table/{job_id}", get(query_table_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(trace_layer)
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}
