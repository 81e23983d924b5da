use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::job::{Job, JobStatus, JobType};
use crate::services::store::{JobStore, StoreError};

/// Partial job update; only populated fields are applied.
#[derive(Debug, Default)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub progress_message: Option<String>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn progress(progress: u8, message: impl Into<String>) -> Self {
        Self {
            progress: Some(progress),
            progress_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn completed(result: serde_json::Value) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100),
            progress_message: Some("Completed".to_string()),
            result: Some(result),
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.progress_message = Some(message.into());
        self
    }
}

struct RunningJob {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Supervisor for asynchronous comparison jobs.
///
/// Owns both the durable store and the in-memory registry of running task
/// handles. Jobs are created PENDING, driven by detached tokio tasks, and
/// mutated only through [`JobQueue::update`], which enforces the lifecycle
/// timestamps and terminal-state immutability.
///
/// Cloning is shallow; clones share the same store and registry.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<JobStore>,
    running: Arc<Mutex<HashMap<Uuid, RunningJob>>>,
    // Serializes read-modify-write cycles so concurrent partial updates
    // cannot clobber each other.
    update_lock: Arc<Mutex<()>>,
}

impl JobQueue {
    pub fn new(store: Arc<JobStore>) -> Self {
        Self {
            store,
            running: Arc::new(Mutex::new(HashMap::new())),
            update_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a new PENDING job and return its id. Runs no work itself.
    pub async fn create(
        &self,
        job_type: JobType,
        request_data: serde_json::Value,
    ) -> Result<Uuid, QueueError> {
        let job = Job::new(job_type, request_data);
        self.store.write(&job).await?;
        metrics::counter!("comparison_jobs_created").increment(1);
        tracing::info!(job_id = %job.job_id, job_type = %job.job_type, "Job created");
        Ok(job.job_id)
    }

    /// Launch `work` as a detached background task bound to `job_id`.
    ///
    /// The caller returns immediately; distinct jobs run concurrently with
    /// no queueing between them. The work future receives a cancellation
    /// token to poll at its cooperative checkpoints. Any error return is
    /// recorded as job FAILED, and the registry entry is removed when the
    /// task ends regardless of outcome.
    pub async fn start_background<F, Fut>(&self, job_id: Uuid, work: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), Box<dyn std::error::Error + Send + Sync>>>
            + Send
            + 'static,
    {
        let token = CancellationToken::new();
        let fut = work(token.clone());
        let queue = self.clone();
        let task_token = token.clone();

        // Hold the registry lock across spawn + insert so the task's own
        // cleanup cannot race ahead of its registration.
        let mut running = self.running.lock().await;
        let handle = tokio::spawn(async move {
            metrics::gauge!("comparison_jobs_running").increment(1.0);
            if let Err(e) = fut.await {
                if task_token.is_cancelled() {
                    tracing::info!(job_id = %job_id, "Background job stopped after cancellation");
                } else {
                    tracing::error!(job_id = %job_id, error = %e, "Background job failed");
                    metrics::counter!("comparison_jobs_failed").increment(1);
                    if let Err(e) = queue.update(job_id, JobUpdate::failed(e.to_string())).await {
                        tracing::error!(job_id = %job_id, error = %e, "Failed to record job failure");
                    }
                }
            }
            metrics::gauge!("comparison_jobs_running").decrement(1.0);
            queue.running.lock().await.remove(&job_id);
        });
        running.insert(job_id, RunningJob { handle, cancel: token });
    }

    /// Apply a partial update against the persisted record.
    ///
    /// `started_at` is set on the first transition to RUNNING and
    /// `completed_at` on reaching a terminal state. Once a job is terminal
    /// the record is immutable; late writes from a finishing pipeline or a
    /// straggling progress estimate are dropped.
    pub async fn update(&self, job_id: Uuid, update: JobUpdate) -> Result<(), QueueError> {
        let _guard = self.update_lock.lock().await;

        let Some(mut job) = self.store.read(job_id).await? else {
            tracing::debug!(job_id = %job_id, "Update for unknown job ignored");
            return Ok(());
        };

        if job.status.is_terminal() {
            tracing::debug!(job_id = %job_id, status = %job.status, "Update after terminal state ignored");
            return Ok(());
        }

        if let Some(status) = update.status {
            job.status = status;
            if status == JobStatus::Running && job.started_at.is_none() {
                job.started_at = Some(Utc::now());
            }
            if status.is_terminal() && job.completed_at.is_none() {
                job.completed_at = Some(Utc::now());
            }
        }
        if let Some(progress) = update.progress {
            job.progress = progress.min(100);
        }
        if let Some(message) = update.progress_message {
            job.progress_message = Some(message);
        }
        if let Some(result) = update.result {
            job.result = Some(result);
        }
        if let Some(error) = update.error {
            job.error = Some(error);
        }

        self.store.write(&job).await?;
        Ok(())
    }

    /// Cancel a pending or running job.
    ///
    /// Cancellation is cooperative: the background task is signalled and
    /// stops at its next checkpoint, but in-flight model calls may still
    /// complete. The job record is forced to CANCELLED immediately.
    pub async fn cancel(&self, job_id: Uuid) -> Result<(), QueueError> {
        let job = self
            .store
            .read(job_id)
            .await?
            .ok_or(QueueError::NotFound(job_id))?;

        if job.status.is_terminal() {
            return Err(QueueError::InvalidCancel(job.status));
        }

        if let Some(entry) = self.running.lock().await.get(&job_id) {
            entry.cancel.cancel();
        }

        self.update(
            job_id,
            JobUpdate::status(JobStatus::Cancelled).with_message("Cancelled by user"),
        )
        .await?;
        metrics::counter!("comparison_jobs_cancelled").increment(1);
        tracing::info!(job_id = %job_id, "Job cancelled");
        Ok(())
    }

    pub async fn get(&self, job_id: Uuid) -> Result<Option<Job>, QueueError> {
        Ok(self.store.read(job_id).await?)
    }

    pub async fn list(&self, limit: usize) -> Result<Vec<Job>, QueueError> {
        Ok(self.store.list(limit).await?)
    }

    pub async fn delete(&self, job_id: Uuid) -> Result<(), QueueError> {
        Ok(self.store.delete(job_id).await?)
    }

    /// Delete every job created more than `days` days ago, regardless of
    /// status. Returns the number of records removed.
    pub async fn cleanup(&self, days: i64) -> Result<usize, QueueError> {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let jobs = self.store.list(usize::MAX).await?;

        let mut removed = 0;
        for job in jobs {
            if job.created_at < cutoff {
                self.store.delete(job.job_id).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, days, "Cleaned up old jobs");
        }
        Ok(removed)
    }

    /// Whether a background task is currently registered for `job_id`.
    pub async fn is_running(&self, job_id: Uuid) -> bool {
        self.running.lock().await.contains_key(&job_id)
    }

    /// Wait for a job's background task to finish. Returns immediately when
    /// no task is registered for `job_id`.
    pub async fn join(&self, job_id: Uuid) {
        let handle = {
            let mut running = self.running.lock().await;
            running.remove(&job_id).map(|entry| entry.handle)
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Cannot cancel job with status: {0}")]
    InvalidCancel(JobStatus),
}
