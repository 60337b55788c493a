//! RunningHub HTTP client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::config::ApiConfig;
use crate::media::MediaKind;

use super::envelope::{CreateTaskData, RawEnvelope, StatusData, UploadData};
use super::{
    AccountStatus, ClientError, CreatedTask, NodeOverride, OutputFile, RemoteApi, TaskRequest,
    TaskStatus, UploadedFile, WorkflowApiJson,
};

const CREATE_ENDPOINT: &str = "/task/openapi/create";
const STATUS_ENDPOINT: &str = "/task/openapi/status";
const OUTPUTS_ENDPOINT: &str = "/task/openapi/outputs";
const CANCEL_ENDPOINT: &str = "/task/openapi/cancel";
const UPLOAD_ENDPOINT: &str = "/task/openapi/upload";
const WORKFLOW_JSON_ENDPOINT: &str = "/api/openapi/getJsonApiFormat";
const ACCOUNT_ENDPOINT: &str = "/uc/openapi/accountStatus";

/// Body of a create-task call.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskBody<'a> {
    api_key: &'a str,
    workflow_id: &'a str,
    #[serde(skip_serializing_if = "no_overrides")]
    node_info_list: &'a [NodeOverride],
    #[serde(skip_serializing_if = "Option::is_none")]
    webhook_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_type: Option<&'a str>,
}

fn no_overrides(list: &&[NodeOverride]) -> bool {
    list.is_empty()
}

/// RunningHub open API client.
pub struct RunningHubClient {
    client: Client,
    config: ApiConfig,
}

impl RunningHubClient {
    /// Create a new client.
    pub fn new(config: ApiConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    /// POST a JSON body and return the raw envelope.
    async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<RawEnvelope, ClientError> {
        let url = format!("{}{}", self.base_url(), endpoint);
        debug!(endpoint = endpoint, "RunningHub request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.request_timeout())
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        decode_envelope(response).await
    }

    async fn post_task_call(&self, endpoint: &str, task_id: &str) -> Result<RawEnvelope, ClientError> {
        let body = json!({ "apiKey": self.config.api_key, "taskId": task_id });
        self.post_json(endpoint, &body).await
    }
}

/// Map a reqwest failure to a transport error.
fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Transport(format!("request timed out: {}", e))
    } else if e.is_connect() {
        ClientError::Transport(format!("connection failed: {}", e))
    } else {
        ClientError::Transport(e.to_string())
    }
}

/// Decode the envelope regardless of HTTP status; fall back to the status
/// only when the body is not an envelope.
async fn decode_envelope(response: Response) -> Result<RawEnvelope, ClientError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    match serde_json::from_str::<RawEnvelope>(&body) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !status.is_success() => Err(ClientError::HttpStatus {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        }),
        Err(e) => Err(ClientError::Decode(format!(
            "{}: {}",
            e,
            body.chars().take(100).collect::<String>()
        ))),
    }
}

#[async_trait]
impl RemoteApi for RunningHubClient {
    fn name(&self) -> &str {
        "runninghub"
    }

    async fn create_task(&self, request: &TaskRequest) -> Result<CreatedTask, ClientError> {
        let body = CreateTaskBody {
            api_key: &self.config.api_key,
            workflow_id: &request.workflow_id,
            node_info_list: &request.overrides,
            webhook_url: request.webhook_url.as_deref(),
            instance_type: request.instance_type.as_deref(),
        };

        let data: CreateTaskData = self.post_json(CREATE_ENDPOINT, &body).await?.into_data()?;
        Ok(CreatedTask {
            task_id: data.task_id,
            task_status: data.task_status,
        })
    }

    async fn query_status(&self, task_id: &str) -> Result<TaskStatus, ClientError> {
        let data: StatusData = self
            .post_task_call(STATUS_ENDPOINT, task_id)
            .await?
            .into_data()?;
        Ok(data.into_status())
    }

    async fn get_outputs(&self, task_id: &str) -> Result<Vec<OutputFile>, ClientError> {
        let outputs: Option<Vec<OutputFile>> = self
            .post_task_call(OUTPUTS_ENDPOINT, task_id)
            .await?
            .into_optional_data()?;
        Ok(outputs.unwrap_or_default())
    }

    async fn upload_bytes(
        &self,
        bytes: Vec<u8>,
        file_name: &str,
        kind: MediaKind,
    ) -> Result<UploadedFile, ClientError> {
        let url = format!("{}{}", self.base_url(), UPLOAD_ENDPOINT);
        debug!(file_name = file_name, size = bytes.len(), "Uploading file");

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(&kind.mime_for(file_name))
            .map_err(|e| ClientError::InvalidRequest(format!("bad mime type: {}", e)))?;

        let form = multipart::Form::new()
            .text("apiKey", self.config.api_key.clone())
            .text("fileType", "input")
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.upload_timeout_secs))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let data: UploadData = decode_envelope(response).await?.into_data()?;
        Ok(UploadedFile {
            local_path: None,
            remote_file_name: data.file_name,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(self.config.download_timeout_secs))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body: String::new(),
            });
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }

    async fn cancel_task(&self, task_id: &str) -> Result<(), ClientError> {
        self.post_task_call(CANCEL_ENDPOINT, task_id)
            .await?
            .into_unit()
    }

    async fn workflow_json(&self, workflow_id: &str) -> Result<WorkflowApiJson, ClientError> {
        let body = json!({ "apiKey": self.config.api_key, "workflowId": workflow_id });
        self.post_json(WORKFLOW_JSON_ENDPOINT, &body)
            .await?
            .into_data()
    }

    async fn account_status(&self) -> Result<AccountStatus, ClientError> {
        let body = json!({ "apikey": self.config.api_key });
        self.post_json(ACCOUNT_ENDPOINT, &body).await?.into_data()
    }
}
