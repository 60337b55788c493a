//! Remote task lifecycle.
//!
//! A task is created by `TaskSubmitter`, driven to a terminal status by
//! `StatusPoller`, and its outputs are written locally by `OutputFetcher`.
//! `TaskPipeline` runs the three in order for one uploaded file.

mod fetcher;
mod pipeline;
mod poller;
mod submitter;
mod types;

pub use fetcher::{
    artifact_file_name, ArtifactOutcome, FetchError, FetchReport, OutputArtifact, OutputFetcher,
};
pub use pipeline::{PipelineError, PipelineReport, TaskPipeline};
pub use poller::{PollError, ProgressFn, Sleeper, StatusPoller, TokioSleeper};
pub use submitter::TaskSubmitter;
pub use types::{PollSettings, RemoteTask, TerminalStatus};
