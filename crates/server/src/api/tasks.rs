use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use runninghub_core::task::{ArtifactOutcome, RemoteTask};
use runninghub_core::workflow::{Orientation, WorkflowBinding};
use runninghub_core::{MediaKind, TaskStatus};

use super::ApiError;
use crate::state::AppState;

fn default_kind() -> MediaKind {
    MediaKind::Video
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Remote file name returned by an upload.
    pub file_name: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: MediaKind,
    /// Video only. Defaults to portrait.
    #[serde(default)]
    pub orientation: Option<Orientation>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub instance_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub task_id: String,
    pub task_status: TaskStatus,
    pub workflow_id: String,
}

impl From<&RemoteTask> for TaskResponse {
    fn from(task: &RemoteTask) -> Self {
        Self {
            task_id: task.task_id().to_string(),
            task_status: task.status().clone(),
            workflow_id: task.workflow_id().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub task_id: String,
    pub task_status: TaskStatus,
    pub terminal: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputEntry {
    pub file_url: String,
    pub file_type: String,
    pub file_name: String,
    /// Where the saved copy is served, e.g. `/output/result.png`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ArtifactOutcome> for OutputEntry {
    fn from(outcome: &ArtifactOutcome) -> Self {
        let artifact = outcome.artifact();
        let (local_url, error) = match outcome {
            ArtifactOutcome::Downloaded { .. } => (
                Some(format!("/output/{}", urlencoding::encode(&artifact.file_name))),
                None,
            ),
            ArtifactOutcome::Failed { error, .. } => (None, Some(error.clone())),
        };
        Self {
            file_url: artifact.remote_url.clone(),
            file_type: artifact.file_type.clone(),
            file_name: artifact.file_name.clone(),
            local_url,
            error,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputsResponse {
    pub task_id: String,
    pub outputs: Vec<OutputEntry>,
    pub partial_failure: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub task_id: String,
    pub cancelled: bool,
}

/// Create a task for an uploaded file.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<Json<TaskResponse>, ApiError> {
    if request.file_name.trim().is_empty() {
        return Err(ApiError::bad_request("fileName is required"));
    }

    let workflows = &state.config().workflows;
    let binding = match request.kind {
        MediaKind::Video => {
            let orientation = request.orientation.unwrap_or(Orientation::Portrait);
            WorkflowBinding::video(&workflows.video, orientation)
        }
        MediaKind::Image => match &workflows.image {
            Some(image) => WorkflowBinding::image(image),
            None => return Err(ApiError::bad_request("Image workflow is not configured")),
        },
    };

    let mut task_request = binding.request_for(&request.file_name);
    if let Some(url) = request.webhook_url {
        task_request = task_request.with_webhook_url(url);
    }
    if let Some(instance_type) = request.instance_type {
        task_request = task_request.with_instance_type(instance_type);
    }

    let task = state.submitter().submit(task_request).await?;
    info!(task_id = %task.task_id(), workflow_id = %task.workflow_id(), "Task created via API");

    Ok(Json(TaskResponse::from(&task)))
}

/// One status query. The caller decides when to ask again.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.api().query_status(&task_id).await?;

    Ok(Json(StatusResponse {
        task_id,
        terminal: status.is_terminal(),
        task_status: status,
    }))
}

/// Download a succeeded task's outputs into the output directory.
pub async fn fetch_outputs(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<OutputsResponse>, ApiError> {
    let status = state.api().query_status(&task_id).await?;
    let task = RemoteTask::observed(task_id, status)?;
    let report = state
        .fetcher()
        .fetch_and_download(&task, state.output_dir())
        .await?;

    Ok(Json(OutputsResponse {
        partial_failure: report.is_partial_failure(),
        outputs: report.outcomes.iter().map(OutputEntry::from).collect(),
        task_id: report.task_id,
    }))
}

pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    state.api().cancel_task(&task_id).await?;
    info!(task_id = %task_id, "Task cancelled via API");

    Ok(Json(CancelResponse {
        task_id,
        cancelled: true,
    }))
}
