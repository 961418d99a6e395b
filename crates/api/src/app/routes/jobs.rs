//! Generic job polling, shared by every job-producing route.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use civicdesk_core::JobId;
use civicdesk_infra::jobs::JobStatusView;

use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/:job_id/status", get(status))
        .route("/:job_id/result", get(result))
}

pub fn status_url(job_id: JobId) -> String {
    format!("/api/jobs/{job_id}/status")
}

pub fn result_url(job_id: JobId) -> String {
    format!("/api/jobs/{job_id}/result")
}

/// GET /api/jobs/:job_id/status
pub async fn status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    status_response(&services, &job_id)
}

/// GET /api/jobs/:job_id/result
pub async fn result(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    result_response(&services, &job_id)
}

/// 200 with the status view, or 404 with the not-found view. Ids that do not
/// parse are treated as unknown.
pub fn status_response(services: &AppServices, raw_id: &str) -> axum::response::Response {
    let view = match raw_id.parse::<JobId>() {
        Ok(job_id) => services.jobs.status(job_id),
        Err(_) => JobStatusView::not_found(),
    };
    let code = if view.exists {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    (code, Json(view)).into_response()
}

pub fn result_response(services: &AppServices, raw_id: &str) -> axum::response::Response {
    let Ok(job_id) = raw_id.parse::<JobId>() else {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", "Job not found");
    };
    match services.jobs.result(job_id) {
        Ok(result) => Json(result).into_response(),
        Err(e) => errors::job_store_error_to_response(e),
    }
}
