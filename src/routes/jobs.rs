use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::job::{Job, JobStatus};
use crate::routes::internal_error;
use crate::services::queue::QueueError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Deserialize)]
pub struct CleanupParams {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

/// GET /api/v1/jobs — List jobs, most recent first.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Job>>, (StatusCode, String)> {
    let jobs = state
        .queue
        .list(params.limit)
        .await
        .map_err(internal_error)?;
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/{job_id} — Poll one job's status and progress.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Job>, (StatusCode, String)> {
    let job = state
        .queue
        .get(job_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Job not found".to_string()))?;
    Ok(Json(job))
}

/// POST /api/v1/jobs/{job_id}/cancel — Cancel a pending or running job.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    match state.queue.cancel(job_id).await {
        Ok(()) => Ok(Json(serde_json::json!({
            "message": "Job cancelled",
            "job_id": job_id,
        }))),
        Err(QueueError::NotFound(_)) => {
            Err((StatusCode::NOT_FOUND, "Job not found".to_string()))
        }
        Err(e @ QueueError::InvalidCancel(_)) => Err((StatusCode::BAD_REQUEST, e.to_string())),
        Err(e) => Err(internal_error(e)),
    }
}

/// DELETE /api/v1/jobs/{job_id} — Delete a job and its result.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if state
        .queue
        .get(job_id)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err((StatusCode::NOT_FOUND, "Job not found".to_string()));
    }

    state.queue.delete(job_id).await.map_err(internal_error)?;
    Ok(Json(serde_json::json!({
        "message": "Job deleted",
        "job_id": job_id,
    })))
}

/// GET /api/v1/jobs/{job_id}/result — Fetch a completed job's result payload.
pub async fn get_job_result(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let job = state
        .queue
        .get(job_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Job not found".to_string()))?;

    if job.status != JobStatus::Completed {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Job is not completed yet. Current status: {}", job.status),
        ));
    }

    let result = job
        .result
        .ok_or((StatusCode::NOT_FOUND, "Job result not found".to_string()))?;
    Ok(Json(result))
}

/// POST /api/v1/jobs/cleanup — Bulk-delete jobs older than N days.
pub async fn cleanup_jobs(
    State(state): State<AppState>,
    Query(params): Query<CleanupParams>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let removed = state
        .queue
        .cleanup(params.days)
        .await
        .map_err(internal_error)?;
    Ok(Json(serde_json::json!({
        "message": format!("Cleaned up jobs older than {} days", params.days),
        "removed": removed,
    })))
}
