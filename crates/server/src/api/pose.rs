use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use runninghub_core::workflow::{Dimensions, OutputSizing, PosePrompts, PoseRequest, PoseWorkflow};

use super::tasks::TaskResponse;
use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePoseTaskRequest {
    pub source_file_name: String,
    pub pose_file_name: String,
    #[serde(default)]
    pub prompt1: Option<String>,
    #[serde(default)]
    pub prompt2: Option<String>,
    /// Output size rule; needs the source frame unless it is `original`.
    #[serde(default)]
    pub sizing: Option<OutputSizing>,
    #[serde(default)]
    pub source_width: Option<u32>,
    #[serde(default)]
    pub source_height: Option<u32>,
}

fn pose_workflow(state: &AppState) -> Result<&PoseWorkflow, ApiError> {
    state
        .pose_workflow()
        .ok_or_else(|| ApiError::bad_request("Pose workflow is not configured"))
}

/// Default prompts of the pose workflow.
pub async fn get_prompts(State(state): State<Arc<AppState>>) -> Result<Json<PosePrompts>, ApiError> {
    let workflow = pose_workflow(&state)?;
    Ok(Json(workflow.fetch_default_prompts(state.api()).await))
}

pub async fn create_pose_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePoseTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    let workflow = pose_workflow(&state)?;

    let mut pose = PoseRequest::new(request.source_file_name, request.pose_file_name)
        .with_prompts(request.prompt1, request.prompt2);

    if let Some(sizing) = request.sizing {
        pose = match (request.source_width, request.source_height, sizing) {
            (Some(w), Some(h), sizing) => pose.with_sizing(sizing, Dimensions::new(w, h))?,
            (_, _, OutputSizing::Original) => pose,
            _ => {
                return Err(ApiError::bad_request(
                    "sourceWidth and sourceHeight are required for output sizing",
                ))
            }
        };
    }

    let task_request = workflow.request(&pose)?;
    let task = state.submitter().submit(task_request).await?;
    info!(task_id = %task.task_id(), "Pose task created via API");

    Ok(Json(TaskResponse::from(&task)))
}
