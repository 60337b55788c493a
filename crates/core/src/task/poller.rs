//! Status polling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{ClientError, RemoteApi, TaskStatus};

use super::types::{PollSettings, RemoteTask, TerminalStatus};

/// Errors that end a poll before a terminal status was seen.
#[derive(Debug, Error)]
pub enum PollError {
    /// A status query failed. Transport errors are not retried.
    #[error("Status query failed: {0}")]
    Query(#[from] ClientError),

    /// The attempt budget ran out while the task was still pending.
    #[error("Task still pending after {attempts} status queries")]
    Timeout { attempts: u32 },
}

/// Waits between status queries.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Called after every status query with the status observed and the
/// attempt number (1-based).
pub type ProgressFn = Arc<dyn Fn(&TaskStatus, u32) + Send + Sync>;

/// Queries a task's status until it is terminal or the budget runs out.
#[derive(Clone)]
pub struct StatusPoller {
    api: Arc<dyn RemoteApi>,
    sleeper: Arc<dyn Sleeper>,
    progress: Option<ProgressFn>,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self::with_sleeper(api, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(api: Arc<dyn RemoteApi>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            api,
            sleeper,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Poll until SUCCESS or FAILED.
    ///
    /// Makes at most `max_attempts` queries with one `interval` sleep between
    /// consecutive queries and none after the last. `task` always holds the
    /// most recently observed status.
    pub async fn poll_until_terminal(
        &self,
        task: &mut RemoteTask,
        settings: PollSettings,
    ) -> Result<TerminalStatus, PollError> {
        let max_attempts = settings.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let status = self.api.query_status(task.task_id()).await.map_err(|e| {
                warn!(task_id = %task.task_id(), attempt = attempt, error = %e, "Status query failed");
                PollError::Query(e)
            })?;

            if &status != task.status() {
                info!(
                    task_id = %task.task_id(),
                    from = %task.status(),
                    to = %status,
                    attempt = attempt,
                    "Task status changed"
                );
            } else {
                debug!(task_id = %task.task_id(), status = %status, attempt = attempt, "Task status");
            }
            if let TaskStatus::Unknown(raw) = &status {
                debug!(task_id = %task.task_id(), status = %raw, "Unrecognized status, still waiting");
            }

            task.set_status(status);
            if let Some(progress) = &self.progress {
                progress(task.status(), attempt);
            }

            match task.status() {
                TaskStatus::Success => return Ok(TerminalStatus::Succeeded),
                TaskStatus::Failed => return Ok(TerminalStatus::Failed),
                _ => {}
            }

            if attempt < max_attempts {
                self.sleeper.sleep(settings.interval).await;
            }
        }

        warn!(
            task_id = %task.task_id(),
            attempts = max_attempts,
            status = %task.status(),
            "Gave up waiting for task"
        );
        Err(PollError::Timeout {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TaskRequest;
    use crate::task::TaskSubmitter;
    use crate::testing::{MockRemoteApi, RecordingSleeper};
    use std::sync::Mutex;

    async fn submitted(api: &Arc<MockRemoteApi>) -> RemoteTask {
        TaskSubmitter::new(api.clone())
            .submit(TaskRequest::new("W1"))
            .await
            .unwrap()
    }

    fn settings(max_attempts: u32) -> PollSettings {
        PollSettings::new(max_attempts, Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_queued_running_success() {
        let api = Arc::new(MockRemoteApi::new().with_statuses([
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Success,
        ]));
        let sleeper = Arc::new(RecordingSleeper::new());
        let poller = StatusPoller::with_sleeper(api.clone(), sleeper.clone());

        let mut task = submitted(&api).await;
        let terminal = poller.poll_until_terminal(&mut task, settings(60)).await.unwrap();

        assert_eq!(terminal, TerminalStatus::Succeeded);
        assert_eq!(task.status(), &TaskStatus::Success);
        assert_eq!(api.status_calls(), 3);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(10); 2]);
    }

    #[tokio::test]
    async fn test_timeout_after_budget() {
        let api = Arc::new(MockRemoteApi::new().with_statuses([TaskStatus::Running]));
        let sleeper = Arc::new(RecordingSleeper::new());
        let poller = StatusPoller::with_sleeper(api.clone(), sleeper.clone());

        let mut task = submitted(&api).await;
        let err = poller.poll_until_terminal(&mut task, settings(4)).await.unwrap_err();

        assert!(matches!(err, PollError::Timeout { attempts: 4 }));
        assert_eq!(api.status_calls(), 4);
        assert_eq!(sleeper.count(), 3);
        assert_eq!(task.status(), &TaskStatus::Running);
    }

    #[tokio::test]
    async fn test_failed_stops_immediately() {
        let api = Arc::new(MockRemoteApi::new().with_statuses([TaskStatus::Failed]));
        let sleeper = Arc::new(RecordingSleeper::new());
        let poller = StatusPoller::with_sleeper(api.clone(), sleeper.clone());

        let mut task = submitted(&api).await;
        let terminal = poller.poll_until_terminal(&mut task, settings(60)).await.unwrap();

        assert_eq!(terminal, TerminalStatus::Failed);
        assert_eq!(api.status_calls(), 1);
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn test_single_attempt_never_sleeps() {
        let api = Arc::new(MockRemoteApi::new().with_statuses([TaskStatus::Queued]));
        let sleeper = Arc::new(RecordingSleeper::new());
        let poller = StatusPoller::with_sleeper(api.clone(), sleeper.clone());

        let mut task = submitted(&api).await;
        let err = poller.poll_until_terminal(&mut task, settings(1)).await.unwrap_err();

        assert!(matches!(err, PollError::Timeout { attempts: 1 }));
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_status_is_pending() {
        let api = Arc::new(MockRemoteApi::new().with_statuses([
            TaskStatus::from("PAUSED"),
            TaskStatus::Success,
        ]));
        let sleeper = Arc::new(RecordingSleeper::new());
        let poller = StatusPoller::with_sleeper(api.clone(), sleeper.clone());

        let mut task = submitted(&api).await;
        let terminal = poller.poll_until_terminal(&mut task, settings(5)).await.unwrap();

        assert_eq!(terminal, TerminalStatus::Succeeded);
        assert_eq!(api.status_calls(), 2);
        assert_eq!(sleeper.count(), 1);
    }

    #[tokio::test]
    async fn test_query_error_is_not_retried() {
        let api = Arc::new(MockRemoteApi::new().with_status_error(ClientError::Transport(
            "connection reset".into(),
        )));
        let sleeper = Arc::new(RecordingSleeper::new());
        let poller = StatusPoller::with_sleeper(api.clone(), sleeper.clone());

        let mut task = submitted(&api).await;
        let err = poller.poll_until_terminal(&mut task, settings(10)).await.unwrap_err();

        match err {
            PollError::Query(e) => assert!(e.is_transport()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.status_calls(), 1);
        assert_eq!(sleeper.count(), 0);
    }

    #[tokio::test]
    async fn test_progress_reports_each_attempt() {
        let api = Arc::new(MockRemoteApi::new().with_statuses([
            TaskStatus::Queued,
            TaskStatus::Running,
            TaskStatus::Success,
        ]));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let poller = StatusPoller::with_sleeper(api.clone(), Arc::new(RecordingSleeper::new()))
            .with_progress(Arc::new(move |status: &TaskStatus, attempt| {
                sink.lock().unwrap().push((attempt, status.clone()));
            }));

        let mut task = submitted(&api).await;
        poller.poll_until_terminal(&mut task, settings(60)).await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (1, TaskStatus::Queued),
                (2, TaskStatus::Running),
                (3, TaskStatus::Success)
            ]
        );
    }

    #[tokio::test]
    async fn test_terminal_status_is_sticky() {
        let api = Arc::new(MockRemoteApi::new().with_statuses([TaskStatus::Success]));
        let task = submitted(&api).await;

        for _ in 0..3 {
            assert_eq!(api.query_status(task.task_id()).await.unwrap(), TaskStatus::Success);
        }
    }
}
