//! Upload, submit, poll and fetch for one input file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::client::{ClientError, RemoteApi};
use crate::workflow::{SelectionError, WorkflowBinding};

use super::fetcher::{FetchError, FetchReport, OutputFetcher};
use super::poller::{PollError, StatusPoller};
use super::submitter::TaskSubmitter;
use super::types::{PollSettings, TerminalStatus};

/// Error type for pipeline runs, tagged by the stage that failed.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Workflow selection failed: {0}")]
    Select(#[from] SelectionError),

    #[error("Upload failed: {0}")]
    Upload(#[source] ClientError),

    #[error("Task creation failed: {0}")]
    Submit(#[source] ClientError),

    #[error("Status polling failed for task {task_id}: {source}")]
    Poll {
        task_id: String,
        #[source]
        source: ClientError,
    },

    #[error("Task {task_id} still pending after {attempts} status queries")]
    PollTimeout { task_id: String, attempts: u32 },

    /// The service reported FAILED.
    #[error("Task {task_id} failed remotely")]
    TaskFailed { task_id: String },

    #[error("Fetching outputs failed: {0}")]
    Fetch(#[from] FetchError),

    /// The pipeline task panicked or was aborted.
    #[error("Pipeline aborted: {0}")]
    Aborted(String),
}

impl PipelineError {
    /// Stage name for reports and logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Select(_) => "select",
            PipelineError::Upload(_) => "upload",
            PipelineError::Submit(_) => "submit",
            PipelineError::Poll { .. } | PipelineError::PollTimeout { .. } => "poll",
            PipelineError::TaskFailed { .. } => "remote_failed",
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Aborted(_) => "aborted",
        }
    }

    /// Remote task id, when the failure happened after creation.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            PipelineError::Poll { task_id, .. }
            | PipelineError::PollTimeout { task_id, .. }
            | PipelineError::TaskFailed { task_id } => Some(task_id),
            _ => None,
        }
    }
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub local_file: PathBuf,
    pub workflow_id: String,
    pub remote_file_name: String,
    pub task_id: String,
    pub artifacts: FetchReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Runs one local file through a workflow.
///
/// Stages run strictly in order; nothing is retried here.
#[derive(Clone)]
pub struct TaskPipeline {
    api: Arc<dyn RemoteApi>,
    submitter: TaskSubmitter,
    poller: StatusPoller,
    fetcher: OutputFetcher,
    settings: PollSettings,
    output_dir: PathBuf,
}

impl TaskPipeline {
    pub fn new(api: Arc<dyn RemoteApi>, settings: PollSettings, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            submitter: TaskSubmitter::new(api.clone()),
            poller: StatusPoller::new(api.clone()),
            fetcher: OutputFetcher::new(api.clone()),
            api,
            settings,
            output_dir: output_dir.into(),
        }
    }

    /// Replace the poller, e.g. to inject a sleeper or progress callback.
    pub fn with_poller(mut self, poller: StatusPoller) -> Self {
        self.poller = poller;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn run(
        &self,
        local_file: &Path,
        binding: &WorkflowBinding,
    ) -> Result<PipelineReport, PipelineError> {
        let started_at = Utc::now();

        let uploaded = self
            .api
            .upload_file(local_file, binding.kind)
            .await
            .map_err(PipelineError::Upload)?;
        info!(
            path = %local_file.display(),
            remote_file_name = %uploaded.remote_file_name,
            "Uploaded input"
        );

        let request = binding.request_for(&uploaded.remote_file_name);
        let mut task = self
            .submitter
            .submit(request)
            .await
            .map_err(PipelineError::Submit)?;
        let task_id = task.task_id().to_string();

        match self.poller.poll_until_terminal(&mut task, self.settings).await {
            Ok(TerminalStatus::Succeeded) => {}
            Ok(TerminalStatus::Failed) => {
                warn!(task_id = %task_id, path = %local_file.display(), "Task failed remotely");
                return Err(PipelineError::TaskFailed { task_id });
            }
            Err(PollError::Query(source)) => return Err(PipelineError::Poll { task_id, source }),
            Err(PollError::Timeout { attempts }) => {
                return Err(PipelineError::PollTimeout { task_id, attempts })
            }
        }

        let artifacts = self
            .fetcher
            .fetch_and_download(&task, &self.output_dir)
            .await?;

        info!(
            task_id = %task_id,
            path = %local_file.display(),
            downloaded = artifacts.downloaded().count(),
            "Pipeline completed"
        );

        Ok(PipelineReport {
            local_file: local_file.to_path_buf(),
            workflow_id: binding.workflow_id.clone(),
            remote_file_name: uploaded.remote_file_name,
            task_id,
            artifacts,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
