use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use runninghub_core::client::AccountStatus;
use runninghub_core::SanitizedConfig;

use super::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Balance and running task count of the configured account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AccountStatus>, ApiError> {
    Ok(Json(state.api().account_status().await?))
}
