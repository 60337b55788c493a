//! Batch types.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::task::{ArtifactOutcome, PipelineError, PipelineReport};
use crate::workflow::WorkflowSelector;

/// One file to process and how to pick its workflow.
#[derive(Clone)]
pub struct BatchInput {
    pub local_file: PathBuf,
    pub selector: Arc<dyn WorkflowSelector>,
}

impl BatchInput {
    pub fn new(local_file: impl Into<PathBuf>, selector: Arc<dyn WorkflowSelector>) -> Self {
        Self {
            local_file: local_file.into(),
            selector,
        }
    }
}

impl fmt::Debug for BatchInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchInput")
            .field("local_file", &self.local_file)
            .finish_non_exhaustive()
    }
}

/// Terminal outcome of one input.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Succeeded {
        report: PipelineReport,
        attempts: u32,
    },
    Failed {
        stage: String,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        attempts: u32,
    },
}

impl BatchOutcome {
    pub(crate) fn failed(error: &PipelineError, attempts: u32) -> Self {
        BatchOutcome::Failed {
            stage: error.stage().to_string(),
            error: error.to_string(),
            task_id: error.task_id().map(str::to_string),
            attempts,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Succeeded { .. })
    }

    /// Artifacts of a succeeded pipeline that could not be downloaded.
    pub fn artifact_failures(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        match self {
            BatchOutcome::Succeeded { report, .. } => Some(report.artifacts.failed()),
            BatchOutcome::Failed { .. } => None,
        }
        .into_iter()
        .flatten()
    }
}

/// Every input of a batch with its outcome.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    /// Keyed by input path; one entry per distinct input.
    pub outcomes: BTreeMap<PathBuf, BatchOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Failed artifact downloads across all succeeded inputs.
    pub fn artifact_failures(&self) -> impl Iterator<Item = (&PathBuf, &ArtifactOutcome)> {
        self.outcomes
            .iter()
            .flat_map(|(path, outcome)| outcome.artifact_failures().map(move |a| (path, a)))
    }

    /// Every input succeeded and every artifact was downloaded.
    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0 && self.artifact_failures().next().is_none()
    }
}

/// Snapshot of the runner's pipeline pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub max_concurrent: usize,
    pub active: usize,
    pub queued: usize,
    /// Highest `active` seen since the runner was created.
    pub peak_active: usize,
    pub total_processed: u64,
    pub total_failed: u64,
}
