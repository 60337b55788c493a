//! Output retrieval.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use reqwest::Url;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{ClientError, OutputFile, RemoteApi, TaskStatus};

use super::types::RemoteTask;

/// Errors that prevent any artifact from being attempted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Task {task_id} has not succeeded (status {status})")]
    NotSucceeded { task_id: String, status: TaskStatus },

    #[error("Failed to list outputs: {0}")]
    Outputs(#[from] ClientError),

    #[error("Failed to prepare output directory: {0}")]
    Io(#[from] std::io::Error),
}

/// One produced file and, once written, where it landed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputArtifact {
    pub remote_url: String,
    pub file_type: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

/// Result of one artifact download.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Downloaded { artifact: OutputArtifact },
    Failed { artifact: OutputArtifact, error: String },
}

impl ArtifactOutcome {
    pub fn artifact(&self) -> &OutputArtifact {
        match self {
            ArtifactOutcome::Downloaded { artifact } | ArtifactOutcome::Failed { artifact, .. } => {
                artifact
            }
        }
    }

    pub fn is_downloaded(&self) -> bool {
        matches!(self, ArtifactOutcome::Downloaded { .. })
    }
}

/// Every artifact of a task with its outcome, in service order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchReport {
    pub task_id: String,
    pub outcomes: Vec<ArtifactOutcome>,
}

impl FetchReport {
    pub fn downloaded(&self) -> impl Iterator<Item = &OutputArtifact> {
        self.outcomes
            .iter()
            .filter(|o| o.is_downloaded())
            .map(ArtifactOutcome::artifact)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes.iter().filter(|o| !o.is_downloaded())
    }

    /// True when some but not all artifacts failed.
    pub fn is_partial_failure(&self) -> bool {
        let failed = self.failed().count();
        failed > 0 && failed < self.outcomes.len()
    }

    pub fn all_downloaded(&self) -> bool {
        self.outcomes.iter().all(ArtifactOutcome::is_downloaded)
    }
}

/// Local file name for an artifact.
///
/// Uses the last path segment of the URL. Falls back to
/// `<task_id>_<index>.<file_type>` when the URL has no usable segment.
pub fn artifact_file_name(file_url: &str, task_id: &str, index: usize, file_type: &str) -> String {
    let segment = match Url::parse(file_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => file_url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .map(str::to_string),
    };

    match segment {
        Some(name) if is_usable_file_name(&name) => name,
        _ => {
            let ext = if file_type.is_empty() { "bin" } else { file_type };
            format!("{}_{}.{}", task_id, index, ext)
        }
    }
}

fn is_usable_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('\\')
}

/// Lists a task's outputs and writes each one under a local directory.
#[derive(Clone)]
pub struct OutputFetcher {
    api: Arc<dyn RemoteApi>,
}

impl OutputFetcher {
    pub fn new(api: Arc<dyn RemoteApi>) -> Self {
        Self { api }
    }

    /// List and download every output of a succeeded task.
    ///
    /// A failed artifact is recorded in the report and the remaining ones
    /// are still attempted.
    pub async fn fetch_and_download(
        &self,
        task: &RemoteTask,
        dest_dir: &Path,
    ) -> Result<FetchReport, FetchError> {
        if task.status() != &TaskStatus::Success {
            return Err(FetchError::NotSucceeded {
                task_id: task.task_id().to_string(),
                status: task.status().clone(),
            });
        }

        let outputs = self.api.get_outputs(task.task_id()).await?;
        debug!(task_id = %task.task_id(), count = outputs.len(), "Listed task outputs");
        tokio::fs::create_dir_all(dest_dir).await?;

        let outcomes: Vec<ArtifactOutcome> = self
            .download_stream(task.task_id(), outputs, dest_dir)
            .collect()
            .await;

        let report = FetchReport {
            task_id: task.task_id().to_string(),
            outcomes,
        };
        info!(
            task_id = %report.task_id,
            downloaded = report.downloaded().count(),
            failed = report.failed().count(),
            "Fetched task outputs"
        );
        Ok(report)
    }

    /// Download artifacts one at a time, yielding each outcome as it
    /// completes. Nothing is fetched until the stream is polled.
    pub fn download_stream<'a>(
        &'a self,
        task_id: &'a str,
        outputs: Vec<OutputFile>,
        dest_dir: &'a Path,
    ) -> impl Stream<Item = ArtifactOutcome> + Send + 'a {
        stream::iter(outputs.into_iter().enumerate())
            .then(move |(index, output)| self.download_one(task_id, index, output, dest_dir))
    }

    async fn download_one(
        &self,
        task_id: &str,
        index: usize,
        output: OutputFile,
        dest_dir: &Path,
    ) -> ArtifactOutcome {
        let file_name = artifact_file_name(&output.file_url, task_id, index, &output.file_type);
        let mut artifact = OutputArtifact {
            remote_url: output.file_url,
            file_type: output.file_type,
            file_name,
            local_path: None,
        };

        let bytes = match self.api.download(&artifact.remote_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(task_id = task_id, url = %artifact.remote_url, error = %e, "Artifact download failed");
                return ArtifactOutcome::Failed {
                    artifact,
                    error: e.to_string(),
                };
            }
        };

        let path = dest_dir.join(&artifact.file_name);
        if let Err(e) = tokio::fs::write(&path, &bytes).await {
            warn!(task_id = task_id, path = %path.display(), error = %e, "Failed to write artifact");
            return ArtifactOutcome::Failed {
                artifact,
                error: e.to_string(),
            };
        }

        debug!(task_id = task_id, path = %path.display(), size = bytes.len(), "Artifact saved");
        artifact.local_path = Some(path);
        ArtifactOutcome::Downloaded { artifact }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRemoteApi;
    use tempfile::TempDir;

    fn output(url: &str, file_type: &str) -> OutputFile {
        OutputFile {
            file_url: url.to_string(),
            file_type: file_type.to_string(),
            node_id: None,
            task_cost_time: None,
        }
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            artifact_file_name("https://cdn.example/out/T1/out.png", "T1", 0, "png"),
            "out.png"
        );
        assert_eq!(
            artifact_file_name("https://cdn.example/out/a.mp4?sig=abc", "T1", 0, "mp4"),
            "a.mp4"
        );
        assert_eq!(artifact_file_name("relative/path/b.jpg?x=1", "T1", 0, "jpg"), "b.jpg");
    }

    #[test]
    fn test_file_name_fallback() {
        assert_eq!(artifact_file_name("https://cdn.example/", "T1", 2, "png"), "T1_2.png");
        assert_eq!(artifact_file_name("https://cdn.example", "T1", 0, ""), "T1_0.bin");
        assert_eq!(artifact_file_name("", "T7", 1, "mp4"), "T7_1.mp4");
    }

    #[tokio::test]
    async fn test_not_succeeded_is_rejected() {
        let api = Arc::new(MockRemoteApi::new());
        let fetcher = OutputFetcher::new(api.clone());
        let dir = TempDir::new().unwrap();

        let task = RemoteTask::observed("T1", TaskStatus::Running).unwrap();
        let err = fetcher.fetch_and_download(&task, dir.path()).await.unwrap_err();

        assert!(matches!(err, FetchError::NotSucceeded { .. }));
        assert_eq!(api.output_calls(), 0);
    }

    #[tokio::test]
    async fn test_downloads_single_output() {
        let api = Arc::new(
            MockRemoteApi::new()
                .with_outputs(vec![output("https://cdn.example/T1/out.png", "png")])
                .with_file("https://cdn.example/T1/out.png", b"png-bytes".to_vec()),
        );
        let fetcher = OutputFetcher::new(api);
        let dir = TempDir::new().unwrap();

        let task = RemoteTask::observed("T1", TaskStatus::Success).unwrap();
        let report = fetcher.fetch_and_download(&task, dir.path()).await.unwrap();

        assert!(report.all_downloaded());
        let path = dir.path().join("out.png");
        assert_eq!(report.outcomes[0].artifact().local_path.as_ref(), Some(&path));
        assert_eq!(std::fs::read(&path).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_partial_failure_attempts_every_artifact() {
        let api = Arc::new(
            MockRemoteApi::new()
                .with_outputs(vec![
                    output("https://cdn.example/1.png", "png"),
                    output("https://cdn.example/2.png", "png"),
                    output("https://cdn.example/3.png", "png"),
                ])
                .with_failing_url("https://cdn.example/2.png"),
        );
        let fetcher = OutputFetcher::new(api.clone());
        let dir = TempDir::new().unwrap();

        let task = RemoteTask::observed("T1", TaskStatus::Success).unwrap();
        let report = fetcher.fetch_and_download(&task, dir.path()).await.unwrap();

        assert_eq!(api.download_calls(), 3);
        assert!(report.is_partial_failure());
        assert!(report.outcomes[0].is_downloaded());
        assert!(!report.outcomes[1].is_downloaded());
        assert!(report.outcomes[2].is_downloaded());
        assert!(dir.path().join("1.png").exists());
        assert!(!dir.path().join("2.png").exists());
        assert!(dir.path().join("3.png").exists());
    }

    #[tokio::test]
    async fn test_empty_outputs() {
        let api = Arc::new(MockRemoteApi::new().with_outputs(Vec::new()));
        let fetcher = OutputFetcher::new(api);
        let dir = TempDir::new().unwrap();

        let task = RemoteTask::observed("T1", TaskStatus::Success).unwrap();
        let report = fetcher.fetch_and_download(&task, dir.path()).await.unwrap();

        assert!(report.outcomes.is_empty());
        assert!(!report.is_partial_failure());
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let api = Arc::new(MockRemoteApi::new());
        let fetcher = OutputFetcher::new(api.clone());
        let dir = TempDir::new().unwrap();

        let outputs = vec![
            output("https://cdn.example/a.png", "png"),
            output("https://cdn.example/b.png", "png"),
        ];
        let mut stream = Box::pin(fetcher.download_stream("T1", outputs, dir.path()));
        assert_eq!(api.download_calls(), 0);

        let first = stream.next().await.unwrap();
        assert_eq!(first.artifact().file_name, "a.png");
        assert_eq!(api.download_calls(), 1);
    }
}
