//! Types for the remote workflow API.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::media::MediaKind;

/// Errors that can occur while talking to the remote service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally before any network call.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request did not complete (timeout, DNS, connection reset).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status without a decodable envelope.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The service answered with a non-zero application code.
    #[error("Remote rejected request (code {code}): {message}")]
    Rejected {
        code: i64,
        message: String,
        kind: RejectionKind,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Creates a rejection from the raw envelope fields.
    pub fn rejected(code: i64, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
            kind: RejectionKind::from_code(code),
        }
    }

    /// Kind of rejection, if the service rejected the call.
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            Self::Rejected { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Whether the request failed before the service answered.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Application codes the caller may want to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Workflow must be run once from the web UI before API use (810).
    WorkflowNotRunOnce,
    /// A node id or field name does not match the workflow graph (803).
    InvalidNodeInfo,
    /// Unknown workflow id (380).
    WorkflowNotFound,
    Other,
}

impl RejectionKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            810 => RejectionKind::WorkflowNotRunOnce,
            803 => RejectionKind::InvalidNodeInfo,
            380 => RejectionKind::WorkflowNotFound,
            _ => RejectionKind::Other,
        }
    }

    /// What a user can do about it, when there is something to do.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            RejectionKind::WorkflowNotRunOnce => {
                Some("run the workflow once from the web UI before calling it through the API")
            }
            RejectionKind::InvalidNodeInfo => Some("check the configured node ids and field names"),
            RejectionKind::WorkflowNotFound => Some("check the configured workflow id"),
            RejectionKind::Other => None,
        }
    }
}

/// Remote task status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Queued,
    Running,
    Success,
    Failed,
    /// A status string this client does not know; treated as pending.
    Unknown(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Queued => "QUEUED",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Unknown(s) => s.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "QUEUED" => TaskStatus::Queued,
            "RUNNING" => TaskStatus::Running,
            "SUCCESS" => TaskStatus::Success,
            "FAILED" => TaskStatus::Failed,
            _ => TaskStatus::Unknown(s),
        }
    }
}

impl From<&str> for TaskStatus {
    fn from(s: &str) -> Self {
        TaskStatus::from(s.to_string())
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(nodeId, fieldName, fieldValue)` override of a workflow parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOverride {
    pub node_id: String,
    pub field_name: String,
    pub field_value: String,
}

impl NodeOverride {
    pub fn new(
        node_id: impl Into<String>,
        field_name: impl Into<String>,
        field_value: impl Into<String>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            field_name: field_name.into(),
            field_value: field_value.into(),
        }
    }
}

/// Request to run a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub workflow_id: String,
    /// Sent in this exact order.
    pub overrides: Vec<NodeOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Machine class, e.g. `plus` for the 48G instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
}

impl TaskRequest {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            overrides: Vec::new(),
            webhook_url: None,
            instance_type: None,
        }
    }

    pub fn with_override(mut self, node_override: NodeOverride) -> Self {
        self.overrides.push(node_override);
        self
    }

    pub fn with_overrides(mut self, overrides: impl IntoIterator<Item = NodeOverride>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }
}

/// Result of a successful create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub task_id: String,
    pub task_status: TaskStatus,
}

/// One output file as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
    pub file_url: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_cost_time: Option<Value>,
}

/// A local file staged at the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
    /// Name assigned by the service; use it verbatim as a field value.
    pub remote_file_name: String,
}

/// Workflow graph in ComfyUI API format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowApiJson {
    /// Either a JSON-encoded string or an object, depending on the endpoint version.
    #[serde(default)]
    pub prompt: Value,
}

impl WorkflowApiJson {
    /// Node map keyed by node id.
    pub fn nodes(&self) -> Result<Map<String, Value>, ClientError> {
        match &self.prompt {
            Value::Object(map) => Ok(map.clone()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) => Err(ClientError::Decode("workflow prompt is not an object".into())),
                Err(e) => Err(ClientError::Decode(format!("workflow prompt: {}", e))),
            },
            Value::Null => Ok(Map::new()),
            _ => Err(ClientError::Decode("unexpected workflow prompt type".into())),
        }
    }

    /// `inputs.<field>` of a node as a string, if present.
    pub fn node_input(&self, node_id: &str, field: &str) -> Option<String> {
        let nodes = self.nodes().ok()?;
        nodes
            .get(node_id)?
            .get("inputs")?
            .get(field)?
            .as_str()
            .map(str::to_string)
    }
}

/// Account balance and usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStatus {
    #[serde(default)]
    pub remain_coins: Option<Value>,
    #[serde(default)]
    pub current_task_counts: Option<Value>,
    #[serde(default)]
    pub remain_money: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub api_type: Option<String>,
}

/// The remote workflow-execution service.
///
/// Every call is a single request; nothing here retries.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Returns the name of this backend.
    fn name(&self) -> &str;

    async fn create_task(&self, request: &TaskRequest) -> Result<CreatedTask, ClientError>;

    async fn query_status(&self, task_id: &str) -> Result<TaskStatus, ClientError>;

    async fn get_outputs(&self, task_id: &str) -> Result<Vec<OutputFile>, ClientError>;

    /// Stage raw bytes at the service under `file_name`.
    async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        kind: MediaKind,
    ) -> Result<UploadedFile, ClientError>;

    /// GET an artifact URL. Anything but HTTP 200 is an error.
    async fn download(&self, url: &str) -> Result<Vec<u8>, ClientError>;

    async fn cancel_task(&self, task_id: &str) -> Result<(), ClientError>;

    async fn workflow_json(&self, workflow_id: &str) -> Result<WorkflowApiJson, ClientError>;

    async fn account_status(&self) -> Result<AccountStatus, ClientError>;

    /// Read a local file and stage it.
    async fn upload_file(&self, path: &Path, kind: MediaKind) -> Result<UploadedFile, ClientError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                ClientError::InvalidRequest(format!("no file name in {}", path.display()))
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        let mut uploaded = self.upload_bytes(bytes, &file_name, kind).await?;
        uploaded.local_path = Some(path.to_path_buf());
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_status_round_trip_strings() {
        assert_eq!(TaskStatus::from("QUEUED"), TaskStatus::Queued);
        assert_eq!(TaskStatus::from("SUCCESS"), TaskStatus::Success);
        assert_eq!(
            TaskStatus::from("PAUSED"),
            TaskStatus::Unknown("PAUSED".to_string())
        );
        assert_eq!(TaskStatus::Unknown("PAUSED".into()).as_str(), "PAUSED");
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Unknown("X".into()).is_terminal());
    }

    #[test]
    fn test_task_status_serde() {
        let status: TaskStatus = serde_json::from_value(json!("RUNNING")).unwrap();
        assert_eq!(status, TaskStatus::Running);
        assert_eq!(serde_json::to_value(TaskStatus::Failed).unwrap(), json!("FAILED"));
    }

    #[test]
    fn test_node_override_wire_format() {
        let o = NodeOverride::new("21", "image", " Photo.PNG ");
        assert_eq!(
            serde_json::to_value(&o).unwrap(),
            json!({"nodeId": "21", "fieldName": "image", "fieldValue": " Photo.PNG "})
        );
    }

    #[test]
    fn test_rejection_kinds() {
        assert_eq!(RejectionKind::from_code(810), RejectionKind::WorkflowNotRunOnce);
        assert_eq!(RejectionKind::from_code(803), RejectionKind::InvalidNodeInfo);
        assert_eq!(RejectionKind::from_code(380), RejectionKind::WorkflowNotFound);
        assert_eq!(RejectionKind::from_code(1), RejectionKind::Other);

        let err = ClientError::rejected(803, "node not found");
        assert_eq!(err.rejection_kind(), Some(RejectionKind::InvalidNodeInfo));
        assert!(err.to_string().contains("803"));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_workflow_json_string_prompt() {
        let wf = WorkflowApiJson {
            prompt: json!(r#"{"25": {"inputs": {"text": "hello"}}, "35": {"inputs": {"prompt": 3}}}"#),
        };
        assert_eq!(wf.node_input("25", "text").as_deref(), Some("hello"));
        assert_eq!(wf.node_input("35", "prompt"), None);
        assert_eq!(wf.node_input("99", "text"), None);
    }

    #[test]
    fn test_workflow_json_object_prompt() {
        let wf = WorkflowApiJson {
            prompt: json!({"1": {"class_type": "LoadVideo", "inputs": {"video": "a.mp4"}}}),
        };
        assert_eq!(wf.nodes().unwrap().len(), 1);
        assert_eq!(wf.node_input("1", "video").as_deref(), Some("a.mp4"));
    }

    #[test]
    fn test_task_request_builder_keeps_order() {
        let req = TaskRequest::new("W1")
            .with_override(NodeOverride::new("2", "b", "x"))
            .with_overrides([NodeOverride::new("1", "a", "y")])
            .with_instance_type("plus");
        assert_eq!(req.overrides[0].node_id, "2");
        assert_eq!(req.overrides[1].node_id, "1");
        assert_eq!(req.instance_type.as_deref(), Some("plus"));
    }
}
