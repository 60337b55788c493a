use std::path::Path;
use std::sync::Arc;

use runninghub_core::task::{OutputFetcher, TaskSubmitter};
use runninghub_core::workflow::PoseWorkflow;
use runninghub_core::{Config, RemoteApi, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    api: Arc<dyn RemoteApi>,
    submitter: TaskSubmitter,
    fetcher: OutputFetcher,
    pose: Option<PoseWorkflow>,
}

impl AppState {
    pub fn new(config: Config, api: Arc<dyn RemoteApi>) -> Self {
        let pose = config.workflows.pose.clone().map(PoseWorkflow::new);
        Self {
            submitter: TaskSubmitter::new(Arc::clone(&api)),
            fetcher: OutputFetcher::new(Arc::clone(&api)),
            config,
            api,
            pose,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn api(&self) -> &dyn RemoteApi {
        self.api.as_ref()
    }

    pub fn submitter(&self) -> &TaskSubmitter {
        &self.submitter
    }

    pub fn fetcher(&self) -> &OutputFetcher {
        &self.fetcher
    }

    /// `None` when no pose workflow is configured.
    pub fn pose_workflow(&self) -> Option<&PoseWorkflow> {
        self.pose.as_ref()
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.storage.output_dir
    }
}
