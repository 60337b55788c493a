//! Pose transfer workflow.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{NodeOverride, RemoteApi, TaskRequest, WorkflowApiJson};
use crate::config::PoseWorkflowConfig;

use super::{latent_overrides, Dimensions, OutputSizing, SelectionError};

/// Inputs of one pose-transfer run. File names are remote names returned by
/// an upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseRequest {
    pub source_file: String,
    pub pose_file: String,
    /// Configured default when absent.
    #[serde(default)]
    pub prompt1: Option<String>,
    /// Configured default when absent; omitted when blank.
    #[serde(default)]
    pub prompt2: Option<String>,
    /// Latent size; the workflow's own size when absent.
    #[serde(default)]
    pub output_size: Option<Dimensions>,
}

impl PoseRequest {
    pub fn new(source_file: impl Into<String>, pose_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            pose_file: pose_file.into(),
            ..Default::default()
        }
    }

    pub fn with_prompts(mut self, prompt1: Option<String>, prompt2: Option<String>) -> Self {
        self.prompt1 = prompt1;
        self.prompt2 = prompt2;
        self
    }

    /// Size the output relative to the source image's frame.
    pub fn with_sizing(
        mut self,
        sizing: OutputSizing,
        source: Dimensions,
    ) -> Result<Self, SelectionError> {
        self.output_size = Some(sizing.compute(source)?);
        Ok(self)
    }
}

/// Default prompts as baked into the pose workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosePrompts {
    pub prompt1: String,
    pub prompt2: String,
}

/// Binds `PoseRequest`s to the configured pose workflow.
#[derive(Debug, Clone)]
pub struct PoseWorkflow {
    config: PoseWorkflowConfig,
}

impl PoseWorkflow {
    pub fn new(config: PoseWorkflowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PoseWorkflowConfig {
        &self.config
    }

    /// Build the create-task request.
    ///
    /// Prompt values are passed unmodified; the second prompt is only sent
    /// when it has non-whitespace content.
    pub fn request(&self, pose: &PoseRequest) -> Result<TaskRequest, SelectionError> {
        if pose.source_file.trim().is_empty() {
            return Err(SelectionError::MissingInput("source image".into()));
        }
        if pose.pose_file.trim().is_empty() {
            return Err(SelectionError::MissingInput("pose image".into()));
        }

        let config = &self.config;
        let prompt1 = pose
            .prompt1
            .clone()
            .unwrap_or_else(|| config.default_prompt1.clone());
        let prompt2 = pose
            .prompt2
            .clone()
            .unwrap_or_else(|| config.default_prompt2.clone());

        let mut request = TaskRequest::new(config.workflow_id.clone())
            .with_override(NodeOverride::new(
                config.source_image_node_id.clone(),
                "image",
                pose.source_file.clone(),
            ))
            .with_override(NodeOverride::new(
                config.pose_image_node_id.clone(),
                "image",
                pose.pose_file.clone(),
            ))
            .with_override(NodeOverride::new(
                config.prompt1_node_id.clone(),
                "text",
                prompt1,
            ));

        if !prompt2.trim().is_empty() {
            request = request.with_override(NodeOverride::new(
                config.prompt2_node_id.clone(),
                "prompt",
                prompt2,
            ));
        }

        if let Some(size) = pose.output_size {
            request = request.with_overrides(latent_overrides(&config.latent_node_id, size));
        }

        Ok(request)
    }

    /// Read default prompts from the workflow graph, falling back to the
    /// configured defaults for anything missing.
    pub fn default_prompts(&self, workflow: Option<&WorkflowApiJson>) -> PosePrompts {
        let config = &self.config;
        let from_graph = |node_id: &str, field: &str| {
            workflow.and_then(|wf| wf.node_input(node_id, field))
        };

        PosePrompts {
            prompt1: from_graph(&config.prompt1_node_id, "text")
                .unwrap_or_else(|| config.default_prompt1.clone()),
            prompt2: from_graph(&config.prompt2_node_id, "prompt")
                .unwrap_or_else(|| config.default_prompt2.clone()),
        }
    }

    /// Fetch the workflow graph and read its default prompts. Remote
    /// failures fall back to the configured defaults.
    pub async fn fetch_default_prompts(&self, api: &dyn RemoteApi) -> PosePrompts {
        match api.workflow_json(&self.config.workflow_id).await {
            Ok(workflow) => self.default_prompts(Some(&workflow)),
            Err(e) => {
                warn!(
                    workflow_id = %self.config.workflow_id,
                    error = %e,
                    "Could not read workflow prompts, using configured defaults"
                );
                self.default_prompts(None)
            }
        }
    }
}
