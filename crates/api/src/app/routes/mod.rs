use axum::Router;

pub mod cache_admin;
pub mod chat;
pub mod jobs;
pub mod profiles;
pub mod system;

/// Router for every `/api` endpoint.
pub fn router() -> Router {
    Router::new()
        .nest("/api/civic/llm-chat", chat::router())
        .nest("/api/civic/representatives", profiles::router())
        .nest("/api/jobs", jobs::router())
        .nest("/api/admin/cache", cache_admin::router())
}
