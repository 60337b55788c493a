//! Task creation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::client::{ClientError, RemoteApi, TaskRequest};

use super::types::RemoteTask;

/// Issues create-task calls. One call per `submit`, never retried.
#[derive(Clone)]
pub struct TaskSubmitter {
    api: Arc<dyn RemoteApi>,
}

impl TaskSubmitter {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    /// Create a remote task.
    ///
    /// Node ids and field names are not checked locally; the service
    /// rejects mismatches with a code that is returned unchanged.
    pub async fn submit(&self, request: TaskRequest) -> Result<RemoteTask, ClientError> {
        if request.workflow_id.trim().is_empty() {
            return Err(ClientError::InvalidRequest("workflow id is empty".into()));
        }

        debug!(
            workflow_id = %request.workflow_id,
            overrides = request.overrides.len(),
            "Submitting task"
        );

        let created = self.api.create_task(&request).await?;
        if created.task_id.trim().is_empty() {
            return Err(ClientError::Decode(
                "create response carried an empty task id".into(),
            ));
        }

        info!(
            workflow_id = %request.workflow_id,
            task_id = %created.task_id,
            status = %created.task_status,
            "Task created"
        );

        Ok(RemoteTask::created(request, created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{NodeOverride, RejectionKind, TaskStatus};
    use crate::testing::MockRemoteApi;

    #[tokio::test]
    async fn test_submit_populates_task() {
        let api = Arc::new(MockRemoteApi::new());
        let submitter = TaskSubmitter::new(api.clone());

        let request = TaskRequest::new("W1").with_override(NodeOverride::new("21", "image", "photo.png"));
        let task = submitter.submit(request.clone()).await.unwrap();

        assert!(!task.task_id().is_empty());
        assert_eq!(task.status(), &TaskStatus::Queued);
        assert_eq!(api.create_requests().await, vec![request]);
    }

    #[tokio::test]
    async fn test_empty_workflow_id_is_rejected_locally() {
        let api = Arc::new(MockRemoteApi::new());
        let submitter = TaskSubmitter::new(api.clone());

        let err = submitter.submit(TaskRequest::new(" ")).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
        assert_eq!(api.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejection_is_surfaced_unchanged() {
        let api = Arc::new(MockRemoteApi::new().with_create_rejection(810, "run it once first"));
        let submitter = TaskSubmitter::new(api.clone());

        let err = submitter.submit(TaskRequest::new("W1")).await.unwrap_err();
        match err {
            ClientError::Rejected { code, message, kind } => {
                assert_eq!(code, 810);
                assert_eq!(message, "run it once first");
                assert_eq!(kind, RejectionKind::WorkflowNotRunOnce);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(api.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_task_id_is_decode_error() {
        let api = Arc::new(MockRemoteApi::new().with_created_task_id(""));
        let submitter = TaskSubmitter::new(api);

        let err = submitter.submit(TaskRequest::new("W1")).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_uploaded_name_passes_through_verbatim() {
        let api = Arc::new(MockRemoteApi::new());
        let submitter = TaskSubmitter::new(api.clone());

        let remote_name = "api/ 9f3c Clip Name.MP4 ";
        let request = TaskRequest::new("W1").with_override(NodeOverride::new("184", "video", remote_name));
        submitter.submit(request).await.unwrap();

        let sent = api.create_requests().await;
        assert_eq!(sent[0].overrides[0].field_value.as_bytes(), remote_name.as_bytes());
    }
}
