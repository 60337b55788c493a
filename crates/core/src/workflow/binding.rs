//! Workflow bindings: which workflow runs and where the input goes.

use serde::Serialize;

use crate::client::{NodeOverride, TaskRequest};
use crate::config::{ImageWorkflowConfig, VideoWorkflowConfig};
use crate::media::MediaKind;

use super::Orientation;

/// A workflow plus the node that receives the uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowBinding {
    pub workflow_id: String,
    pub kind: MediaKind,
    pub input_node_id: String,
    pub input_field: String,
    /// Sent after the input override, in this order.
    pub extra_overrides: Vec<NodeOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
}

impl WorkflowBinding {
    pub fn new(
        workflow_id: impl Into<String>,
        kind: MediaKind,
        input_node_id: impl Into<String>,
        input_field: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            kind,
            input_node_id: input_node_id.into(),
            input_field: input_field.into(),
            extra_overrides: Vec::new(),
            instance_type: None,
        }
    }

    /// Video watermark-removal workflow for the given orientation.
    pub fn video(config: &VideoWorkflowConfig, orientation: Orientation) -> Self {
        let workflow_id = match orientation {
            Orientation::Landscape => &config.landscape,
            Orientation::Portrait => &config.portrait,
        };
        Self::new(
            workflow_id.clone(),
            MediaKind::Video,
            config.node_id.clone(),
            config.field_name.clone(),
        )
    }

    /// Image watermark-removal workflow.
    pub fn image(config: &ImageWorkflowConfig) -> Self {
        Self::new(
            config.workflow_id.clone(),
            MediaKind::Image,
            config.node_id.clone(),
            config.field_name.clone(),
        )
    }

    pub fn with_override(mut self, node_override: NodeOverride) -> Self {
        self.extra_overrides.push(node_override);
        self
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = Some(instance_type.into());
        self
    }

    /// Task request feeding `remote_file_name` into the input node.
    pub fn request_for(&self, remote_file_name: &str) -> TaskRequest {
        let mut request = TaskRequest::new(self.workflow_id.clone())
            .with_override(NodeOverride::new(
                self.input_node_id.clone(),
                self.input_field.clone(),
                remote_file_name,
            ))
            .with_overrides(self.extra_overrides.iter().cloned());
        if let Some(instance_type) = &self.instance_type {
            request = request.with_instance_type(instance_type.clone());
        }
        request
    }
}
