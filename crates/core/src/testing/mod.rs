//! Testing utilities and mock implementations.
//!
//! This module provides a mock of the remote workflow service and a sleeper
//! that records instead of waiting, so the whole submit/poll/fetch flow can
//! be tested without network access or real delays.
//!
//! # Example
//!
//! ```rust,ignore
//! use runninghub_core::testing::{MockRemoteApi, RecordingSleeper};
//!
//! let api = Arc::new(MockRemoteApi::new().with_statuses([TaskStatus::Running, TaskStatus::Success]));
//! let sleeper = Arc::new(RecordingSleeper::new());
//! let poller = StatusPoller::with_sleeper(api.clone(), sleeper.clone());
//! ```

mod mock_remote_api;
mod recording_sleeper;

pub use mock_remote_api::{MockRemoteApi, RecordedUpload};
pub use recording_sleeper::RecordingSleeper;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::client::OutputFile;
    use crate::config::{Config, VideoWorkflowConfig, WorkflowsConfig};

    /// A valid config with placeholder workflow ids.
    pub fn config() -> Config {
        Config {
            api: crate::config::ApiConfig {
                api_key: "test-key".to_string(),
                ..Default::default()
            },
            server: Default::default(),
            storage: Default::default(),
            poll: Default::default(),
            batch: Default::default(),
            workflows: WorkflowsConfig {
                video: VideoWorkflowConfig {
                    landscape: "WL".to_string(),
                    portrait: "WP".to_string(),
                    node_id: "184".to_string(),
                    field_name: "video".to_string(),
                },
                image: None,
                pose: None,
            },
            probe: Default::default(),
        }
    }

    /// An output as the service would list it.
    pub fn output_file(url: &str, file_type: &str) -> OutputFile {
        OutputFile {
            file_url: url.to_string(),
            file_type: file_type.to_string(),
            node_id: None,
            task_cost_time: None,
        }
    }

    /// Write a small file into `dir` and return its path.
    pub fn input_file(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("contents of {}", name)).expect("write input fixture");
        path
    }
}
