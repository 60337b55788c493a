//! Per-input workflow selection.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::VideoWorkflowConfig;
use crate::media::MediaKind;

use super::{DimensionProbe, Orientation, SelectionError, WorkflowBinding};

/// Picks the workflow for one local file.
///
/// Runs on the blocking pool and must not touch the network.
pub trait WorkflowSelector: Send + Sync {
    fn select(&self, local_file: &Path) -> Result<WorkflowBinding, SelectionError>;
}

fn check_kind(local_file: &Path, kind: MediaKind) -> Result<(), SelectionError> {
    let name = local_file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if kind.allows(name) {
        Ok(())
    } else {
        Err(SelectionError::UnsupportedFile {
            path: local_file.to_path_buf(),
            kind,
        })
    }
}

/// Always the same workflow.
#[derive(Debug, Clone)]
pub struct FixedSelector {
    binding: WorkflowBinding,
}

impl FixedSelector {
    pub fn new(binding: WorkflowBinding) -> Self {
        Self { binding }
    }
}

impl WorkflowSelector for FixedSelector {
    fn select(&self, local_file: &Path) -> Result<WorkflowBinding, SelectionError> {
        check_kind(local_file, self.binding.kind)?;
        Ok(self.binding.clone())
    }
}

/// Landscape or portrait workflow depending on the file's frame size.
///
/// When probing fails the landscape workflow is used.
pub struct OrientationSelector {
    landscape: WorkflowBinding,
    portrait: WorkflowBinding,
    probe: Arc<dyn DimensionProbe>,
}

impl OrientationSelector {
    pub fn new(
        landscape: WorkflowBinding,
        portrait: WorkflowBinding,
        probe: Arc<dyn DimensionProbe>,
    ) -> Self {
        Self {
            landscape,
            portrait,
            probe,
        }
    }

    /// Video selector from the configured watermark-removal workflows.
    pub fn for_video(config: &VideoWorkflowConfig, probe: Arc<dyn DimensionProbe>) -> Self {
        Self::new(
            WorkflowBinding::video(config, Orientation::Landscape),
            WorkflowBinding::video(config, Orientation::Portrait),
            probe,
        )
    }

    fn binding_for(&self, orientation: Orientation) -> &WorkflowBinding {
        match orientation {
            Orientation::Landscape => &self.landscape,
            Orientation::Portrait => &self.portrait,
        }
    }
}

impl WorkflowSelector for OrientationSelector {
    fn select(&self, local_file: &Path) -> Result<WorkflowBinding, SelectionError> {
        check_kind(local_file, self.landscape.kind)?;

        let orientation = match self.probe.dimensions(local_file) {
            Ok(dimensions) => {
                let orientation = dimensions.orientation();
                debug!(
                    path = %local_file.display(),
                    dimensions = %dimensions,
                    orientation = %orientation,
                    "Probed input"
                );
                orientation
            }
            Err(e) => {
                warn!(
                    path = %local_file.display(),
                    error = %e,
                    "Could not probe input, using landscape workflow"
                );
                Orientation::Landscape
            }
        };

        Ok(self.binding_for(orientation).clone())
    }
}
