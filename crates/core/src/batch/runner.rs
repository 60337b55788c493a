//! Bounded-concurrency batch runner.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::task::{PipelineError, TaskPipeline};

use super::types::{BatchInput, BatchOutcome, BatchReport, PoolStatus};

type Results = Arc<RwLock<HashMap<PathBuf, BatchOutcome>>>;

/// Tracks statistics for the pipeline pool.
#[derive(Default)]
struct PoolStats {
    active: AtomicUsize,
    queued: AtomicUsize,
    peak_active: AtomicUsize,
    total_processed: AtomicU64,
    total_failed: AtomicU64,
}

impl PoolStats {
    fn to_status(&self, max_concurrent: usize) -> PoolStatus {
        PoolStatus {
            max_concurrent,
            active: self.active.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            peak_active: self.peak_active.load(Ordering::Relaxed),
            total_processed: self.total_processed.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

/// Counts a pipeline as active until dropped, including on panic.
struct ActiveGuard(Arc<PoolStats>);

impl ActiveGuard {
    fn enter(stats: Arc<PoolStats>) -> Self {
        let now = stats.active.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak_active.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs many pipelines with at most `max_concurrent` in flight.
pub struct BatchRunner {
    pipeline: Arc<TaskPipeline>,
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    retries: u32,
    stats: Arc<PoolStats>,
}

impl BatchRunner {
    /// `max_concurrent` is clamped to at least 1.
    pub fn new(pipeline: TaskPipeline, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            pipeline: Arc::new(pipeline),
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            retries: 0,
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Re-run a failed pipeline from the start up to `retries` more times.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn status(&self) -> PoolStatus {
        self.stats.to_status(self.max_concurrent)
    }

    /// Run every input to a terminal outcome.
    ///
    /// One input's failure never cancels the others. Duplicate paths are
    /// processed once.
    pub async fn run_batch(&self, inputs: Vec<BatchInput>) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let results: Results = Arc::new(RwLock::new(HashMap::new()));

        let mut seen = HashSet::new();
        let mut tasks = JoinSet::new();
        let mut paths_by_task = HashMap::new();

        for input in inputs {
            if !seen.insert(input.local_file.clone()) {
                warn!(path = %input.local_file.display(), "Duplicate batch input skipped");
                continue;
            }

            let path = input.local_file.clone();
            let handle = tasks.spawn(Self::run_one(
                input,
                Arc::clone(&self.pipeline),
                Arc::clone(&self.semaphore),
                Arc::clone(&self.stats),
                self.retries,
                Arc::clone(&results),
            ));
            paths_by_task.insert(handle.id(), path);
        }

        info!(
            batch_id = %batch_id,
            inputs = paths_by_task.len(),
            max_concurrent = self.max_concurrent,
            "Batch started"
        );

        while let Some(joined) = tasks.join_next_with_id().await {
            if let Err(e) = joined {
                let Some(path) = paths_by_task.get(&e.id()) else {
                    continue;
                };
                error!(path = %path.display(), error = %e, "Pipeline task aborted");
                self.stats.total_processed.fetch_add(1, Ordering::Relaxed);
                self.stats.total_failed.fetch_add(1, Ordering::Relaxed);
                let outcome = BatchOutcome::failed(&PipelineError::Aborted(e.to_string()), 1);
                results
                    .write()
                    .await
                    .entry(path.clone())
                    .or_insert(outcome);
            }
        }

        let outcomes: BTreeMap<PathBuf, BatchOutcome> =
            std::mem::take(&mut *results.write().await).into_iter().collect();
        let report = BatchReport {
            batch_id,
            outcomes,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            batch_id = %batch_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            artifact_failures = report.artifact_failures().count(),
            "Batch finished"
        );
        report
    }

    async fn run_one(
        input: BatchInput,
        pipeline: Arc<TaskPipeline>,
        semaphore: Arc<Semaphore>,
        stats: Arc<PoolStats>,
        retries: u32,
        results: Results,
    ) {
        let path = input.local_file.clone();

        stats.queued.fetch_add(1, Ordering::Relaxed);
        let permit = semaphore.acquire_owned().await;
        stats.queued.fetch_sub(1, Ordering::Relaxed);

        let outcome = match permit {
            Ok(_permit) => {
                let _active = ActiveGuard::enter(Arc::clone(&stats));
                Self::select_and_run(input, &pipeline, retries).await
            }
            Err(_) => BatchOutcome::failed(
                &PipelineError::Aborted("pipeline pool closed".into()),
                0,
            ),
        };

        stats.total_processed.fetch_add(1, Ordering::Relaxed);
        if !outcome.is_success() {
            stats.total_failed.fetch_add(1, Ordering::Relaxed);
        }

        results.write().await.entry(path).or_insert(outcome);
    }

    async fn select_and_run(input: BatchInput, pipeline: &TaskPipeline, retries: u32) -> BatchOutcome {
        let BatchInput {
            local_file,
            selector,
        } = input;

        let select_path = local_file.clone();
        let selected = tokio::task::spawn_blocking(move || selector.select(&select_path)).await;
        let binding = match selected {
            Ok(Ok(binding)) => binding,
            Ok(Err(e)) => {
                warn!(path = %local_file.display(), error = %e, "Workflow selection failed");
                return BatchOutcome::failed(&PipelineError::Select(e), 0);
            }
            Err(e) => {
                error!(path = %local_file.display(), error = %e, "Workflow selection aborted");
                return BatchOutcome::failed(&PipelineError::Aborted(e.to_string()), 0);
            }
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match pipeline.run(&local_file, &binding).await {
                Ok(report) => {
                    return BatchOutcome::Succeeded {
                        report,
                        attempts: attempt,
                    }
                }
                Err(e) if attempt <= retries => {
                    warn!(
                        path = %local_file.display(),
                        stage = e.stage(),
                        attempt = attempt,
                        error = %e,
                        "Pipeline failed, retrying from the start"
                    );
                }
                Err(e) => {
                    warn!(
                        path = %local_file.display(),
                        stage = e.stage(),
                        error = %e,
                        "Pipeline failed"
                    );
                    return BatchOutcome::failed(&e, attempt);
                }
            }
        }
    }
}
