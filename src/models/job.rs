use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Status of a comparison job in the async queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Kind of comparison work a job carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobType {
    SingleCompare,
    BatchCompare,
}

/// A durable record of one asynchronous comparison request and its lifecycle.
///
/// Persisted as one JSON file per job so records survive process restarts.
/// Optional fields default on deserialization, so records written by older
/// builds keep loading after new fields are added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub job_type: JobType,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Informational estimate, 0-100, monotonically non-decreasing in a run.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub progress_message: Option<String>,
    pub request_data: serde_json::Value,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Job {
    pub fn new(job_type: JobType, request_data: serde_json::Value) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            job_type,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            progress: 0,
            progress_message: None,
            request_data,
            result: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new(JobType::SingleCompare, serde_json::json!({}));
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_snake_case_wire_format() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
        assert_eq!(
            serde_json::to_string(&JobType::BatchCompare).unwrap(),
            "\"batch_compare\""
        );
    }

    #[test]
    fn test_forward_compatible_deserialization() {
        // A record written before progress_message existed still loads.
        let raw = serde_json::json!({
            "job_id": "6f2f1c2e-8f55-4f3e-9f13-02a9d1b7c111",
            "job_type": "single_compare",
            "status": "pending",
            "created_at": "2025-01-01T00:00:00Z",
            "request_data": {"video_id": "abc"}
        });
        let job: Job = serde_json::from_value(raw).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert!(job.progress_message.is_none());
    }
}
