//! Common test utilities for API testing with the mock remote service.
//!
//! This module provides a test fixture that creates an in-process router
//! backed by `MockRemoteApi`, so every endpoint can be exercised without
//! network access.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use runninghub_core::config::{ImageWorkflowConfig, PoseWorkflowConfig, StorageConfig};
use runninghub_core::testing::MockRemoteApi;
use runninghub_core::RemoteApi;

/// Re-export fixtures for test convenience
pub use runninghub_core::testing::fixtures;

const BOUNDARY: &str = "runninghub-test-boundary";

/// Test fixture for API testing with a mock remote service.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_create_task() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/tasks", json!({
///         "fileName": "api/0001_clip.mp4",
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock remote service - script statuses and outputs
    pub api: Arc<MockRemoteApi>,
    /// Temporary directory holding input and output storage
    pub temp_dir: TempDir,
    pub output_dir: PathBuf,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Configure an image workflow
    pub enable_image: bool,
    /// Configure the pose workflow
    pub enable_pose: bool,
}

impl TestFixture {
    /// Create a new test fixture with the default mock.
    pub fn new() -> Self {
        Self::with_api(MockRemoteApi::new(), TestConfig::default())
    }

    /// Create a test fixture around a configured mock.
    pub fn with_api(api: MockRemoteApi, test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let output_dir = temp_dir.path().join("output");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");

        let mut config = fixtures::config();
        config.storage = StorageConfig {
            input_dir: temp_dir.path().join("input"),
            output_dir: output_dir.clone(),
        };
        if test_config.enable_image {
            config.workflows.image = Some(ImageWorkflowConfig {
                workflow_id: "WIMG".to_string(),
                node_id: "21".to_string(),
                field_name: "image".to_string(),
            });
        }
        if test_config.enable_pose {
            config.workflows.pose = Some(PoseWorkflowConfig {
                workflow_id: "WPOSE".to_string(),
                source_image_node_id: "24".to_string(),
                pose_image_node_id: "21".to_string(),
                prompt1_node_id: "25".to_string(),
                prompt2_node_id: "35".to_string(),
                latent_node_id: "38".to_string(),
                default_prompt1: "keep the face".to_string(),
                default_prompt2: String::new(),
            });
        }

        let api = Arc::new(api);
        let state = Arc::new(runninghub_server::state::AppState::new(
            config,
            Arc::clone(&api) as Arc<dyn RemoteApi>,
        ));
        let router = runninghub_server::api::create_router(state);

        Self {
            router,
            api,
            temp_dir,
            output_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a multipart form with text fields and at most one file.
    pub async fn post_multipart(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> TestResponse {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await.0
    }

    /// Send a POST request with a raw body and content type.
    pub async fn post_raw(&self, path: &str, content_type: &str, body: Vec<u8>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body))
            .unwrap();

        self.send(request).await.0
    }

    /// GET a path and return the raw body.
    pub async fn get_bytes(&self, path: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (response, bytes) = self.send(request).await;
        (response.status, bytes)
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await.0
    }

    async fn send(&self, request: Request<Body>) -> (TestResponse, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        (TestResponse { status, body }, body_bytes.to_vec())
    }
}
