//! Process every media file in a directory through its remote workflow.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use runninghub_core::batch::{collect_inputs, BatchInput, BatchOutcome, BatchRunner};
use runninghub_core::task::{ArtifactOutcome, PollSettings, TaskPipeline};
use runninghub_core::workflow::{FfprobeProbe, FixedSelector, OrientationSelector, WorkflowBinding, WorkflowSelector};
use runninghub_core::{load_config, validate_config, MediaKind, RemoteApi, RunningHubClient};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(long, env = "RUNNINGHUB_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Directory to read inputs from (defaults to storage.input_dir)
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Directory to write artifacts to (defaults to storage.output_dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Maximum pipelines in flight (defaults to batch.max_concurrent)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Kind of media to process: video or image
    #[arg(long, default_value = "video")]
    kind: MediaKind,

    /// Write the full batch report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every input succeeded.
async fn run() -> Result<bool> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;
    validate_config(&config).context("Configuration validation failed")?;

    let input_dir = args.input_dir.unwrap_or_else(|| config.storage.input_dir.clone());
    let output_dir = args.output_dir.unwrap_or_else(|| config.storage.output_dir.clone());
    let concurrency = args.concurrency.unwrap_or(config.batch.max_concurrent);

    let selector: Arc<dyn WorkflowSelector> = match args.kind {
        MediaKind::Video => Arc::new(OrientationSelector::for_video(
            &config.workflows.video,
            Arc::new(FfprobeProbe::new(config.probe.ffprobe_path.clone())),
        )),
        MediaKind::Image => {
            let image = config
                .workflows
                .image
                .as_ref()
                .context("No [workflows.image] section configured")?;
            Arc::new(FixedSelector::new(WorkflowBinding::image(image)))
        }
    };

    let files = collect_inputs(&input_dir, args.kind)
        .await
        .with_context(|| format!("Failed to read input directory {:?}", input_dir))?;
    if files.is_empty() {
        info!("No {} files found in {:?}", args.kind, input_dir);
        return Ok(true);
    }
    info!(count = files.len(), concurrency, "Starting batch");

    let api: Arc<dyn RemoteApi> = Arc::new(
        RunningHubClient::new(config.api.clone()).context("Failed to create RunningHub client")?,
    );
    let pipeline = TaskPipeline::new(api, PollSettings::from(&config.poll), output_dir);
    let runner = BatchRunner::new(pipeline, concurrency).with_retries(config.batch.pipeline_retries);

    let inputs = files
        .into_iter()
        .map(|file| BatchInput::new(file, Arc::clone(&selector)))
        .collect();
    let report = runner.run_batch(inputs).await;

    for (path, outcome) in &report.outcomes {
        match outcome {
            BatchOutcome::Succeeded { report, .. } => {
                let label = if report.artifacts.all_downloaded() { "OK" } else { "PARTIAL" };
                println!(
                    "{:<7} {} -> task {} ({} of {} artifacts)",
                    label,
                    path.display(),
                    report.task_id,
                    report.artifacts.downloaded().count(),
                    report.artifacts.outcomes.len()
                );
                for failed in outcome.artifact_failures() {
                    if let ArtifactOutcome::Failed { artifact, error } = failed {
                        println!("        artifact {} failed: {}", artifact.remote_url, error);
                    }
                }
            }
            BatchOutcome::Failed { stage, error, .. } => {
                println!("FAILED  {} [{}] {}", path.display(), stage, error);
            }
        }
    }
    println!(
        "Batch {}: {} succeeded, {} failed, {} artifact downloads failed",
        report.batch_id,
        report.succeeded(),
        report.failed(),
        report.artifact_failures().count()
    );

    if let Some(path) = args.report {
        let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write report to {:?}", path))?;
        info!("Report written to {:?}", path);
    }

    Ok(report.all_succeeded())
}
