//! Types shared by the submitter, poller and fetcher.

use std::time::Duration;

use serde::Serialize;

use crate::client::{ClientError, CreatedTask, NodeOverride, TaskRequest, TaskStatus};
use crate::config::PollConfig;

/// One invocation of a remote workflow.
///
/// Only exists once the service has assigned a task id, so a task can
/// never be polled before creation succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteTask {
    workflow_id: String,
    overrides: Vec<NodeOverride>,
    task_id: String,
    status: TaskStatus,
}

impl RemoteTask {
    pub(crate) fn created(request: TaskRequest, created: CreatedTask) -> Self {
        Self {
            workflow_id: request.workflow_id,
            overrides: request.overrides,
            task_id: created.task_id,
            status: created.task_status,
        }
    }

    /// Rebuild a task known only by id, e.g. from an HTTP request, with the
    /// status the caller just observed.
    pub fn observed(task_id: impl Into<String>, status: TaskStatus) -> Result<Self, ClientError> {
        let task_id = task_id.into();
        if task_id.trim().is_empty() {
            return Err(ClientError::InvalidRequest("task id is empty".into()));
        }
        Ok(Self {
            workflow_id: String::new(),
            overrides: Vec::new(),
            task_id,
            status,
        })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Empty for tasks rebuilt with `observed`.
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn overrides(&self) -> &[NodeOverride] {
        &self.overrides
    }

    /// Last status reported by the service.
    pub fn status(&self) -> &TaskStatus {
        &self.status
    }

    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }
}

/// Terminal state reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Succeeded,
    Failed,
}

/// Attempt budget for one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollSettings {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on time spent sleeping.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollConfig::default())
    }
}

impl From<&PollConfig> for PollSettings {
    fn from(config: &PollConfig) -> Self {
        Self::new(config.max_attempts, config.interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_task_keeps_request() {
        let request = TaskRequest::new("W1").with_override(NodeOverride::new("21", "image", "a.png"));
        let task = RemoteTask::created(
            request,
            CreatedTask {
                task_id: "T1".into(),
                task_status: TaskStatus::Queued,
            },
        );
        assert_eq!(task.task_id(), "T1");
        assert_eq!(task.workflow_id(), "W1");
        assert_eq!(task.overrides().len(), 1);
        assert_eq!(task.status(), &TaskStatus::Queued);
    }

    #[test]
    fn test_observed_rejects_empty_id() {
        assert!(RemoteTask::observed("", TaskStatus::Success).is_err());
        let task = RemoteTask::observed("T9", TaskStatus::Success).unwrap();
        assert_eq!(task.task_id(), "T9");
        assert!(task.workflow_id().is_empty());
    }

    #[test]
    fn test_poll_settings() {
        let settings = PollSettings::default();
        assert_eq!(settings.max_attempts, 60);
        assert_eq!(settings.interval, Duration::from_secs(10));
        assert_eq!(
            PollSettings::new(3, Duration::from_secs(2)).max_wait(),
            Duration::from_secs(4)
        );
    }
}
