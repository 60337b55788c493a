use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::{handlers, pose, tasks, uploads};
use crate::state::AppState;

/// Uploads may be whole videos.
const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let output_dir = state.output_dir().to_path_buf();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/account", get(handlers::get_account))
        // Uploads
        .route(
            "/uploads",
            post(uploads::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Tasks
        .route("/tasks", post(tasks::create_task))
        .route("/tasks/{id}/status", get(tasks::get_status))
        .route("/tasks/{id}/outputs", post(tasks::fetch_outputs))
        .route("/tasks/{id}/cancel", post(tasks::cancel_task))
        // Pose transfer
        .route("/pose/prompts", get(pose::get_prompts))
        .route("/tasks/pose", post(pose::create_pose_task))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest_service("/output", ServeDir::new(output_dir))
        .layer(TraceLayer::new_for_http())
}
