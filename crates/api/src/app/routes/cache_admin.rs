//! Cache administration. Unauthenticated; deploy behind an internal network.

use std::sync::Arc;

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::info;

use crate::app::{errors, services::AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/clear", post(clear))
        .route("/cleanup", post(cleanup))
}

/// GET /api/admin/cache/stats
pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.cache.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => errors::cache_error_to_response(e),
    }
}

/// POST /api/admin/cache/clear
pub async fn clear(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.cache.clear().await {
        Ok(()) => {
            info!("cache cleared by admin request");
            Json(json!({ "cleared": true })).into_response()
        }
        Err(e) => errors::cache_error_to_response(e),
    }
}

/// POST /api/admin/cache/cleanup
pub async fn cleanup(Extension(services): Extension<Arc<AppServices>>) -> impl IntoResponse {
    Json(services.cache.cleanup().await)
}
