use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use civicdesk_infra::aggregator::AggregateError;
use civicdesk_infra::cache::CacheError;
use civicdesk_infra::jobs::{JobStoreError, SubmitError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn job_store_error_to_response(err: JobStoreError) -> axum::response::Response {
    match err {
        JobStoreError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", "Job not found"),
        // 425 Too Early: the job exists but has no result (yet, or ever if it failed).
        JobStoreError::NotReady { id, status, message } => (
            StatusCode::TOO_EARLY,
            axum::Json(json!({
                "error": "not_ready",
                "message": message,
                "job_id": id,
                "status": status,
            })),
        )
            .into_response(),
    }
}

pub fn submit_error_to_response(err: SubmitError) -> axum::response::Response {
    match err {
        SubmitError::EmptyInput => json_error(StatusCode::BAD_REQUEST, "validation_error", err.to_string()),
        SubmitError::UnknownJobType(_) => {
            error!(error = %err, "route submitted a job type with no registered routine");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "unknown_job_type", err.to_string())
        }
        SubmitError::Saturated { .. } => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, "saturated", err.to_string())
        }
    }
}

pub fn aggregate_error_to_response(err: AggregateError) -> axum::response::Response {
    error!(error = %err, "profile aggregation failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "aggregation_error", err.to_string())
}

pub fn cache_error_to_response(err: CacheError) -> axum::response::Response {
    error!(error = %err, "cache operation failed");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "cache_error", err.to_string())
}

pub fn validation_error(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}
