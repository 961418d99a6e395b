//! Civic chat: submit a question, then poll for the answer.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use civicdesk_infra::jobs::routines::civic_chat;

use crate::app::dto::{ChatSubmitRequest, SubmitResponse};
use crate::app::routes::jobs;
use crate::app::{errors, services::AppServices};

const BASE_PATH: &str = "/api/civic/llm-chat";

pub fn router() -> Router {
    Router::new()
        .route("/submit", post(submit))
        .route("/status/:job_id", get(status))
        .route("/result/:job_id", get(result))
        .route("/stats", get(stats))
}

/// POST /api/civic/llm-chat/submit
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Json(request): Json<ChatSubmitRequest>,
) -> axum::response::Response {
    if request.message.trim().is_empty() {
        return errors::validation_error("message must not be empty");
    }
    let max = services.chat_limits.max_message_chars;
    if request.message.chars().count() > max {
        return errors::validation_error(format!("message must be at most {max} characters"));
    }

    let input = match serde_json::to_value(&request) {
        Ok(input) => input,
        Err(e) => {
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "serialize_error",
                e.to_string(),
            );
        }
    };

    match services.runner.submit(civic_chat::JOB_TYPE, input) {
        Ok(job_id) => {
            info!(job_id = %job_id, "chat job accepted");
            (
                StatusCode::ACCEPTED,
                Json(SubmitResponse::accepted(
                    job_id,
                    "Processing started. Poll the status endpoint for updates.",
                    format!("{BASE_PATH}/status/{job_id}"),
                    format!("{BASE_PATH}/result/{job_id}"),
                )),
            )
                .into_response()
        }
        Err(e) => errors::submit_error_to_response(e),
    }
}

/// GET /api/civic/llm-chat/status/:job_id
pub async fn status(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    jobs::status_response(&services, &job_id)
}

/// GET /api/civic/llm-chat/result/:job_id
pub async fn result(
    Extension(services): Extension<Arc<AppServices>>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    jobs::result_response(&services, &job_id)
}

/// GET /api/civic/llm-chat/stats
pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.jobs.stats())
}
