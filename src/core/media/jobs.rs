//! Background migration jobs.
//!
//! A started migration runs on its own tokio task; callers poll its status
//! by id and may request cancellation, which takes effect at the next batch
//! boundary. Only one migration runs at a time, and only the most recent
//! finished jobs are kept.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::log::LogEntry;
use super::migration::{
    AbortFlag, MigrationCounts, MigrationError, MigrationOptions, MigrationProgress, MigrationRunner,
    MigrationSummary,
};
use crate::database::now_millis;

/// Jobs kept for polling; the oldest finished ones are evicted when a job starts
pub const RETAINED_JOBS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone)]
enum JobOutcome {
    Finished(MigrationSummary),
    Failed(String),
}

struct MigrationJob {
    id: Uuid,
    seq: u64,
    options: MigrationOptions,
    started_at: i64,
    progress: MigrationProgress,
    abort: AbortFlag,
    finished: RwLock<Option<(i64, JobOutcome)>>,
}

impl MigrationJob {
    async fn status(&self) -> JobStatus {
        let finished = self.finished.read().await.clone();

        let (state, finished_at, summary, error) = match finished {
            None => (JobState::Running, None, None, None),
            Some((at, JobOutcome::Finished(summary))) => {
                let state = if summary.cancelled {
                    JobState::Cancelled
                } else {
                    JobState::Completed
                };
                (state, Some(at), Some(summary), None)
            }
            Some((at, JobOutcome::Failed(message))) => (JobState::Failed, Some(at), None, Some(message)),
        };

        JobStatus {
            id: self.id,
            state,
            options: self.options.clone(),
            started_at: self.started_at,
            finished_at,
            cancel_requested: self.abort.is_aborted(),
            counts: self.progress.counts(),
            summary,
            error,
            log: self.progress.log_entries(),
        }
    }
}

/// Snapshot returned to pollers
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: Uuid,
    pub state: JobState,
    pub options: MigrationOptions,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub cancel_requested: bool,
    pub counts: MigrationCounts,
    pub summary: Option<MigrationSummary>,
    pub error: Option<String>,
    pub log: Vec<LogEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Options(#[from] MigrationError),

    #[error("Migration {0} is still running")]
    Busy(Uuid),
}

/// Registry of migration jobs started in this process
pub struct MigrationJobs {
    runner: Arc<MigrationRunner>,
    jobs: RwLock<HashMap<Uuid, Arc<MigrationJob>>>,
    next_seq: AtomicU64,
}

impl MigrationJobs {
    pub fn new(runner: MigrationRunner) -> Self {
        Self {
            runner: Arc::new(runner),
            jobs: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Validate `options` and start the migration in the background
    pub async fn start(&self, options: MigrationOptions) -> Result<Uuid, JobError> {
        options.validate()?;

        let mut jobs = self.jobs.write().await;
        for job in jobs.values() {
            if job.finished.read().await.is_none() {
                return Err(JobError::Busy(job.id));
            }
        }

        // Every remaining job is finished; trim to make room for the new one
        if jobs.len() >= RETAINED_JOBS {
            let mut by_age: Vec<(u64, Uuid)> = jobs.values().map(|j| (j.seq, j.id)).collect();
            by_age.sort_unstable();
            let excess = jobs.len() + 1 - RETAINED_JOBS;
            for (_, id) in by_age.into_iter().take(excess) {
                jobs.remove(&id);
            }
            debug!(evicted = excess, "Evicted finished migration jobs");
        }

        let job = Arc::new(MigrationJob {
            id: Uuid::new_v4(),
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            progress: MigrationProgress::new(options.log_capacity),
            options,
            started_at: now_millis(),
            abort: AbortFlag::new(),
            finished: RwLock::new(None),
        });
        jobs.insert(job.id, job.clone());
        drop(jobs);

        info!(job_id = %job.id, prefix = %job.options.prefix, dry_run = job.options.dry_run, "Migration job started");

        let id = job.id;
        let runner = self.runner.clone();
        tokio::spawn(async move {
            let outcome = match runner.run(&job.options, &job.progress, &job.abort).await {
                Ok(summary) => JobOutcome::Finished(summary),
                Err(e) => {
                    error!(job_id = %job.id, error = %e, "Migration job failed");
                    JobOutcome::Failed(e.to_string())
                }
            };
            *job.finished.write().await = Some((now_millis(), outcome));
        });

        Ok(id)
    }

    pub async fn status(&self, id: Uuid) -> Option<JobStatus> {
        let job = self.jobs.read().await.get(&id).cloned()?;
        Some(job.status().await)
    }

    /// Request cancellation; returns the status, or `None` for an unknown job
    pub async fn cancel(&self, id: Uuid) -> Option<JobStatus> {
        let job = self.jobs.read().await.get(&id).cloned()?;
        job.abort.abort();
        info!(job_id = %id, "Migration cancellation requested");
        Some(job.status().await)
    }

    /// All jobs, most recent first
    pub async fn list(&self) -> Vec<JobStatus> {
        let jobs: Vec<Arc<MigrationJob>> = self.jobs.read().await.values().cloned().collect();
        let mut statuses = Vec::with_capacity(jobs.len());
        for job in jobs {
            statuses.push(job.status().await);
        }
        statuses.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        statuses
    }
}
