use axum::{
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::{
    api::AppState,
    middleware::{make_span_with_request_id, request_id_middleware},
};

pub mod agent;
pub mod profile;
pub mod recommendations;
pub mod records;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api
fn api_routes() -> Router<AppState> {
    Router::new()
        // Profile
        .route("/profile", get(profile::get_profile).post(profile::upsert_profile))
        .route("/profile/preferences", patch(profile::update_preferences))
        .route("/profile/routines", patch(profile::update_routines))
        // Recommendations
        .route("/recommendations", post(recommendations::recommend))
        .route("/recommendations/history", get(recommendations::history))
        .route("/recommendations/feedback/stats", get(recommendations::feedback_stats))
        .route("/recommendations/:id/feedback", post(recommendations::feedback))
        // Records
        .route("/records", get(records::list_records).post(records::create_record))
        .route("/records/stats/summary", get(records::stats))
        .route(
            "/records/:id",
            get(records::get_record)
                .patch(records::update_record)
                .delete(records::delete_record),
        )
        // Agent
        .route("/agent/analysis", get(agent::analysis))
        .route("/agent/chat", post(agent::chat))
        .route("/agent/feedback-analysis", post(agent::feedback_analysis))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
