//! Mock remote workflow service for testing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::client::{
    AccountStatus, ClientError, CreatedTask, OutputFile, RemoteApi, TaskRequest, TaskStatus,
    UploadedFile, WorkflowApiJson,
};
use crate::media::MediaKind;

/// A recorded upload for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub file_name: String,
    pub kind: MediaKind,
    pub size: usize,
    pub remote_file_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct MockTask {
    script: VecDeque<TaskStatus>,
    current: TaskStatus,
}

/// Mock implementation of the RemoteApi trait.
///
/// Provides controllable behavior for testing:
/// - Scripted status sequences, replayed for every created task
/// - Recorded create requests and uploads
/// - Failing uploads, downloads and creates
/// - Optional per-call latency with an in-flight gauge
///
/// # Example
///
/// ```rust,ignore
/// let api = Arc::new(
///     MockRemoteApi::new()
///         .with_statuses([TaskStatus::Queued, TaskStatus::Running, TaskStatus::Success])
///         .with_failing_url("https://cdn.mock/2.png"),
/// );
///
/// let task = TaskSubmitter::new(api.clone()).submit(request).await?;
/// assert_eq!(api.create_calls(), 1);
/// ```
///
/// Once a task's script is exhausted its last status is repeated, so a
/// terminal task stays terminal.
#[derive(Debug)]
pub struct MockRemoteApi {
    status_script: Vec<TaskStatus>,
    tasks: RwLock<HashMap<String, MockTask>>,
    next_status_error: RwLock<Option<ClientError>>,
    created: RwLock<Vec<TaskRequest>>,
    uploads: RwLock<Vec<RecordedUpload>>,
    cancelled: RwLock<Vec<String>>,
    create_rejection: Option<(i64, String)>,
    created_task_id: Option<String>,
    outputs: Option<Vec<OutputFile>>,
    files: HashMap<String, Vec<u8>>,
    failing_urls: HashSet<String>,
    failing_uploads: HashSet<String>,
    workflow: WorkflowApiJson,
    latency: Duration,
    create_calls: AtomicUsize,
    status_calls: AtomicUsize,
    output_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    download_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockRemoteApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemoteApi {
    /// Create a mock whose tasks succeed on the first status query.
    pub fn new() -> Self {
        Self {
            status_script: vec![TaskStatus::Success],
            tasks: RwLock::new(HashMap::new()),
            next_status_error: RwLock::new(None),
            created: RwLock::new(Vec::new()),
            uploads: RwLock::new(Vec::new()),
            cancelled: RwLock::new(Vec::new()),
            create_rejection: None,
            created_task_id: None,
            outputs: None,
            files: HashMap::new(),
            failing_urls: HashSet::new(),
            failing_uploads: HashSet::new(),
            workflow: WorkflowApiJson {
                prompt: serde_json::Value::Null,
            },
            latency: Duration::ZERO,
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            output_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Statuses returned by successive queries of each task.
    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.status_script = statuses.into_iter().collect();
        self
    }

    /// Fail the next status query with `error`.
    pub fn with_status_error(mut self, error: ClientError) -> Self {
        *self.next_status_error.get_mut() = Some(error);
        self
    }

    /// Reject every create call with the given application code.
    pub fn with_create_rejection(mut self, code: i64, message: impl Into<String>) -> Self {
        self.create_rejection = Some((code, message.into()));
        self
    }

    /// Answer create calls with this task id instead of `T<n>`.
    pub fn with_created_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.created_task_id = Some(task_id.into());
        self
    }

    /// Outputs reported for every task.
    pub fn with_outputs(mut self, outputs: Vec<OutputFile>) -> Self {
        self.outputs = Some(outputs);
        self
    }

    /// Bytes served for a download URL.
    pub fn with_file(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(url.into(), bytes);
        self
    }

    /// Downloads of this URL answer HTTP 404.
    pub fn with_failing_url(mut self, url: impl Into<String>) -> Self {
        self.failing_urls.insert(url.into());
        self
    }

    /// Uploads of a file with this name fail with a transport error.
    pub fn with_failing_upload(mut self, file_name: impl Into<String>) -> Self {
        self.failing_uploads.insert(file_name.into());
        self
    }

    pub fn with_workflow_json(mut self, workflow: WorkflowApiJson) -> Self {
        self.workflow = workflow;
        self
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the next status query with `error`.
    pub async fn set_next_status_error(&self, error: ClientError) {
        *self.next_status_error.write().await = Some(error);
    }

    /// Register a task that was not created through this mock.
    pub async fn add_task(&self, task_id: &str, statuses: impl IntoIterator<Item = TaskStatus>) {
        let script: VecDeque<TaskStatus> = statuses.into_iter().collect();
        self.tasks.write().await.insert(
            task_id.to_string(),
            MockTask {
                script,
                current: TaskStatus::Queued,
            },
        );
    }

    /// Every create request, in call order.
    pub async fn create_requests(&self) -> Vec<TaskRequest> {
        self.created.read().await.clone()
    }

    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    pub async fn cancelled(&self) -> Vec<String> {
        self.cancelled.read().await.clone()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn output_calls(&self) -> usize {
        self.output_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Default output URL for a task.
    pub fn output_url(task_id: &str) -> String {
        format!("https://cdn.mock/outputs/{}.png", task_id)
    }

    async fn simulate_call(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn new_task(&self) -> MockTask {
        MockTask {
            script: self.status_script.iter().cloned().collect(),
            current: TaskStatus::Queued,
        }
    }
}

#[async_trait]
impl RemoteApi for MockRemoteApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_task(&self, request: &TaskRequest) -> Result<CreatedTask, ClientError> {
        let n = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_call().await;
        self.created.write().await.push(request.clone());

        if let Some((code, message)) = &self.create_rejection {
            return Err(ClientError::rejected(*code, message.clone()));
        }

        let task_id = self
            .created_task_id
            .clone()
            .unwrap_or_else(|| format!("T{}", n));
        self.tasks
            .write()
            .await
            .insert(task_id.clone(), self.new_task());

        Ok(CreatedTask {
            task_id,
            task_status: TaskStatus::Queued,
        })
    }

    async fn query_status(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await;

        if let Some(error) = self.next_status_error.write().await.take() {
            return Err(error);
        }

        let mut tasks = self.tasks.write().await;
        let task = tasks
            .entry(task_id.to_string())
            .or_insert_with(|| self.new_task());
        if let Some(next) = task.script.pop_front() {
            task.current = next;
        }
        Ok(task.current.clone())
    }

    async fn get_outputs(&self, task_id: &str) -> Result<Vec<OutputFile>, ClientError> {
        self.output_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await;

        Ok(self.outputs.clone().unwrap_or_else(|| {
            vec![OutputFile {
                file_url: Self::output_url(task_id),
                file_type: "png".to_string(),
                node_id: None,
                task_cost_time: None,
            }]
        }))
    }

    async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        kind: MediaKind,
    ) -> Result<UploadedFile, ClientError> {
        let n = self.upload_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_call().await;

        if self.failing_uploads.contains(file_name) {
            return Err(ClientError::Transport(format!(
                "mock upload failure for {}",
                file_name
            )));
        }

        let remote_file_name = format!("api/{:04}_{}", n, file_name);
        self.uploads.write().await.push(RecordedUpload {
            file_name: file_name.to_string(),
            kind,
            size: bytes.len(),
            remote_file_name: remote_file_name.clone(),
            timestamp: Utc::now(),
        });

        Ok(UploadedFile {
            local_path: None,
            remote_file_name,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await;

        if self.failing_urls.contains(url) {
            return Err(ClientError::HttpStatus {
                status: 404,
                body: String::new(),
            });
        }
        Ok(self
            .files
            .get(url)
            .cloned()
            .unwrap_or_else(|| format!("mock artifact {}", url).into_bytes()))
    }

    async fn cancel_task(&self, task_id: &str) -> Result<(), ClientError> {
        self.simulate_call().await;
        self.cancelled.write().await.push(task_id.to_string());
        Ok(())
    }

    async fn workflow_json(&self, _workflow_id: &str) -> Result<WorkflowApiJson, ClientError> {
        self.simulate_call().await;
        Ok(self.workflow.clone())
    }

    async fn account_status(&self) -> Result<AccountStatus, ClientError> {
        self.simulate_call().await;
        Ok(AccountStatus {
            currency: Some("CNY".to_string()),
            ..Default::default()
        })
    }
}
