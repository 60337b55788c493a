//! Workflow selection.
//!
//! Decides which remote workflow processes a local file and how its nodes
//! are parameterized: orientation-based selection for video, fixed
//! bindings, and the pose-transfer workflow with its output sizing.

mod binding;
mod orientation;
mod pose;
mod selector;
mod sizing;

use std::path::PathBuf;

use thiserror::Error;

use crate::media::MediaKind;

pub use binding::WorkflowBinding;
pub use orientation::{DimensionProbe, Dimensions, FfprobeProbe, Orientation};
pub use pose::{PosePrompts, PoseRequest, PoseWorkflow};
pub use selector::{FixedSelector, OrientationSelector, WorkflowSelector};
pub use sizing::{latent_overrides, parse_ratio, FitMode, OutputSizing, RotateTarget, NAMED_RATIOS};

/// Errors raised while choosing or parameterizing a workflow.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("{} is not a supported {kind} file", path.display())]
    UnsupportedFile { path: PathBuf, kind: MediaKind },

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Invalid output sizing: {0}")]
    InvalidSizing(String),

    #[error("Missing input: {0}")]
    MissingInput(String),
}
