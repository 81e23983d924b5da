use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::job::Job;

/// File-backed persistent job store, one JSON document per job.
///
/// Every write lands as a full snapshot: serialize to a temp file, fsync it,
/// then rename over the live record. A crash after `write` returns cannot
/// lose the update, and readers never observe a half-written record. A
/// garbled file fails only its own read; sibling records stay loadable.
pub struct JobStore {
    dir: PathBuf,
    // Linearizes filesystem access across jobs; held per-operation only.
    lock: Mutex<()>,
}

impl JobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(StoreError::Io)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn job_path(&self, job_id: Uuid) -> PathBuf {
        self.dir.join(format!("{job_id}.json"))
    }

    /// Durably persist a full job snapshot.
    pub async fn write(&self, job: &Job) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;

        let bytes = serde_json::to_vec_pretty(job).map_err(StoreError::Serialize)?;
        let tmp = self.dir.join(format!("{}.json.tmp", job.job_id));

        let mut file = tokio::fs::File::create(&tmp).await.map_err(StoreError::Io)?;
        file.write_all(&bytes).await.map_err(StoreError::Io)?;
        // Force the snapshot to disk before the rename makes it visible.
        file.sync_all().await.map_err(StoreError::Io)?;
        drop(file);

        tokio::fs::rename(&tmp, self.job_path(job.job_id))
            .await
            .map_err(StoreError::Io)?;
        Ok(())
    }

    /// Read one job record. Returns `None` when no record exists.
    pub async fn read(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let _guard = self.lock.lock().await;
        read_record(&self.job_path(job_id)).await
    }

    /// List jobs, most recently modified first, capped at `limit`.
    ///
    /// Records that fail to parse are skipped with a warning so one corrupt
    /// file cannot take down the whole listing.
    pub async fn list(&self, limit: usize) -> Result<Vec<Job>, StoreError> {
        let _guard = self.lock.lock().await;

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await.map_err(StoreError::Io)?;
        while let Some(entry) = dir.next_entry().await.map_err(StoreError::Io)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let modified = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .map_err(StoreError::Io)?;
            entries.push((modified, path));
        }

        entries.sort_by(|a, b| b.0.cmp(&a.0));

        let mut jobs = Vec::new();
        for (_, path) in entries.into_iter().take(limit) {
            match read_record(&path).await {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable job record");
                }
            }
        }
        Ok(jobs)
    }

    /// Delete a job record. Deleting a missing record is a no-op.
    pub async fn delete(&self, job_id: Uuid) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        match tokio::fs::remove_file(self.job_path(job_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

async fn read_record(path: &Path) -> Result<Option<Job>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Io(e)),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(StoreError::Serialize)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{JobStatus, JobType};
    use std::time::Duration;

    fn sample_job() -> Job {
        Job::new(
            JobType::SingleCompare,
            serde_json::json!({"video_id": "v1", "prompt": "Describe the scene."}),
        )
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        let mut job = sample_job();
        job.status = JobStatus::Running;
        job.progress = 42;
        store.write(&job).await.unwrap();

        let loaded = store.read(job.job_id).await.unwrap().unwrap();
        assert_eq!(loaded.job_id, job.job_id);
        assert_eq!(loaded.status, JobStatus::Running);
        assert_eq!(loaded.progress, 42);
        assert_eq!(loaded.request_data, job.request_data);
    }

    #[tokio::test]
    async fn test_read_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();
        assert!(store.read(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_fails_only_its_own_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        let good = sample_job();
        store.write(&good).await.unwrap();

        let bad_id = Uuid::new_v4();
        std::fs::write(dir.path().join(format!("{bad_id}.json")), b"{ not json").unwrap();

        assert!(store.read(bad_id).await.is_err());
        assert!(store.read(good.job_id).await.unwrap().is_some());

        // Listing skips the corrupt record instead of erroring out.
        let listed = store.list(10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].job_id, good.job_id);
    }

    #[tokio::test]
    async fn test_list_orders_most_recent_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        let first = sample_job();
        store.write(&first).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = sample_job();
        store.write(&second).await.unwrap();

        let listed = store.list(10).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].job_id, second.job_id);
        assert_eq!(listed[1].job_id, first.job_id);

        let capped = store.list(1).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].job_id, second.job_id);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::new(dir.path()).unwrap();

        let job = sample_job();
        store.write(&job).await.unwrap();
        store.delete(job.job_id).await.unwrap();
        assert!(store.read(job.job_id).await.unwrap().is_none());
        store.delete(job.job_id).await.unwrap();
    }
}
