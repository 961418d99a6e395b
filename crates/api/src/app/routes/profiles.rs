//! Representative profiles, built synchronously or as a background job.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::Value as JsonValue;
use tracing::info;

use civicdesk_infra::aggregator::Subject;
use civicdesk_infra::jobs::routines::representative_profile;

use crate::app::dto::{RefreshQuery, SubmitResponse};
use crate::app::routes::jobs;
use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/profile", post(profile))
        .route("/profile/submit", post(submit_profile))
}

/// POST /api/civic/representatives/profile
///
/// `?refresh=true` skips the cached copy and rebuilds.
pub async fn profile(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<RefreshQuery>,
    Json(subject): Json<Subject>,
) -> axum::response::Response {
    let built = if query.refresh.unwrap_or(false) {
        services.aggregator.refresh_profile(&subject).await
    } else {
        services.aggregator.get_representative_profile(&subject).await
    };

    match built {
        Ok(profile) => Json(profile).into_response(),
        Err(e) => errors::aggregate_error_to_response(e),
    }
}

/// POST /api/civic/representatives/profile/submit
pub async fn submit_profile(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<RefreshQuery>,
    Json(subject): Json<Subject>,
) -> axum::response::Response {
    let mut input = match serde_json::to_value(&subject) {
        Ok(input) => input,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "serialize_error",
                e.to_string(),
            );
        }
    };
    if let Some(fields) = input.as_object_mut() {
        fields.insert(
            "refresh".to_string(),
            JsonValue::Bool(query.refresh.unwrap_or(false)),
        );
    }

    match services.runner.submit(representative_profile::JOB_TYPE, input) {
        Ok(job_id) => {
            info!(job_id = %job_id, subject = %subject.id, "profile job accepted");
            (
                StatusCode::ACCEPTED,
                Json(SubmitResponse::accepted(
                    job_id,
                    format!("Building profile for {}", subject.name),
                    jobs::status_url(job_id),
                    jobs::result_url(job_id),
                )),
            )
                .into_response()
        }
        Err(e) => errors::submit_error_to_response(e),
    }
}
