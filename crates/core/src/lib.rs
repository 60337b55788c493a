pub mod batch;
pub mod client;
pub mod config;
pub mod media;
pub mod task;
pub mod testing;
pub mod workflow;

pub use batch::{collect_inputs, BatchInput, BatchOutcome, BatchReport, BatchRunner};
pub use client::{ClientError, RejectionKind, RemoteApi, RunningHubClient, TaskRequest, TaskStatus};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use media::MediaKind;
pub use task::{
    OutputFetcher, PipelineError, PollError, PollSettings, RemoteTask, StatusPoller, TaskPipeline,
    TaskSubmitter, TerminalStatus,
};
pub use workflow::{OrientationSelector, WorkflowBinding, WorkflowSelector};
