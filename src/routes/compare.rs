use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::compare::{BatchCompareRequest, CompareRequest, JobAccepted};
use crate::models::job::JobType;
use crate::routes::internal_error;
use crate::services::gemini::{select_models, supported_model_names};

/// GET /api/v1/models — List the models available for comparison.
pub async fn list_models() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "models": supported_model_names() }))
}

/// POST /api/v1/compare — Create a single-comparison job.
///
/// Validation happens here, before any job record exists; the handler
/// returns as soon as the background task is registered and the client
/// polls `/api/v1/jobs/{job_id}` for progress.
pub async fn submit_compare(
    State(state): State<AppState>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<JobAccepted>, (StatusCode, String)> {
    request
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    select_models(request.models.as_deref()).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("{e}. Available: {:?}", supported_model_names()),
        )
    })?;

    if state
        .videos
        .resolve(request.video_id)
        .await
        .map_err(internal_error)?
        .is_none()
    {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Video not found: {}", request.video_id),
        ));
    }

    let request_data = serde_json::to_value(&request).map_err(internal_error)?;
    let job_id = state
        .queue
        .create(JobType::SingleCompare, request_data)
        .await
        .map_err(internal_error)?;

    let pipeline = Arc::clone(&state.pipeline);
    state
        .queue
        .start_background(job_id, move |token| async move {
            pipeline.run_single(job_id, request, token).await?;
            Ok(())
        })
        .await;

    Ok(Json(JobAccepted {
        job_id,
        status: "pending".to_string(),
        message: "Comparison job started".to_string(),
    }))
}

/// POST /api/v1/batch-compare — Create a batch job over every video x
/// prompt combination.
pub async fn submit_batch_compare(
    State(state): State<AppState>,
    Json(request): Json<BatchCompareRequest>,
) -> Result<Json<JobAccepted>, (StatusCode, String)> {
    request
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    select_models(request.models.as_deref()).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("{e}. Available: {:?}", supported_model_names()),
        )
    })?;

    for video_id in &request.video_ids {
        if state
            .videos
            .resolve(*video_id)
            .await
            .map_err(internal_error)?
            .is_none()
        {
            return Err((
                StatusCode::NOT_FOUND,
                format!("Video not found: {video_id}"),
            ));
        }
    }

    let request_data = serde_json::to_value(&request).map_err(internal_error)?;
    let job_id = state
        .queue
        .create(JobType::BatchCompare, request_data)
        .await
        .map_err(internal_error)?;

    let total = request.video_ids.len() * request.prompts.len();
    let pipeline = Arc::clone(&state.pipeline);
    state
        .queue
        .start_background(job_id, move |token| async move {
            pipeline.run_batch(job_id, request, token).await?;
            Ok(())
        })
        .await;

    Ok(Json(JobAccepted {
        job_id,
        status: "pending".to_string(),
        message: format!("Batch comparison job started ({total} combinations)"),
    }))
}
