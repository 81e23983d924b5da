use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::video::VideoMetadata;
use crate::routes::internal_error;
use crate::services::storage::mime_for_path;

/// POST /api/v1/video/upload — Upload a video file for analysis.
///
/// The upload is streamed to disk chunk by chunk; the size cap is enforced
/// mid-stream and a partial file is removed on any failure.
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VideoMetadata>, (StatusCode, String)> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("video/") {
            return Err((
                StatusCode::BAD_REQUEST,
                "Invalid file type. Please upload a video file.".to_string(),
            ));
        }

        let original_filename = field.file_name().unwrap_or("video").to_string();
        let (video_id, path) = state.videos.allocate(&original_filename);

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(internal_error)?;
        let mut total_size: usize = 0;

        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    state.videos.discard(&path).await;
                    return Err((StatusCode::BAD_REQUEST, e.to_string()));
                }
            };

            total_size += chunk.len();
            if total_size > state.max_upload_bytes {
                state.videos.discard(&path).await;
                return Err((
                    StatusCode::PAYLOAD_TOO_LARGE,
                    format!(
                        "File too large. Maximum size is {}MB",
                        state.max_upload_bytes / (1024 * 1024)
                    ),
                ));
            }

            if let Err(e) = file.write_all(&chunk).await {
                state.videos.discard(&path).await;
                return Err(internal_error(e));
            }
        }

        file.flush().await.map_err(internal_error)?;
        drop(file);

        let metadata = VideoMetadata {
            id: video_id,
            filename: original_filename,
            size: total_size as u64,
            content_type,
            path,
        };
        state.videos.commit(metadata.clone()).await;

        tracing::info!(video_id = %video_id, size = total_size, "Video uploaded");
        metrics::counter!("video_uploads_total").increment(1);
        return Ok(Json(metadata));
    }

    Err((
        StatusCode::BAD_REQUEST,
        "Missing 'file' field in multipart upload".to_string(),
    ))
}

/// GET /api/v1/video/{video_id} — Stream a video file back.
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let path = state
        .videos
        .resolve(video_id)
        .await
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Video not found".to_string()))?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| (StatusCode::NOT_FOUND, "Video file not found".to_string()))?;

    let body = Body::from_stream(ReaderStream::new(file));
    Ok(([(header::CONTENT_TYPE, mime_for_path(&path))], body))
}

/// GET /api/v1/video/{video_id}/metadata — Fetch upload metadata.
pub async fn get_video_metadata(
    State(state): State<AppState>,
    Path(video_id): Path<Uuid>,
) -> Result<Json<VideoMetadata>, (StatusCode, String)> {
    state
        .videos
        .metadata(video_id)
        .await
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Video not found".to_string()))
}
