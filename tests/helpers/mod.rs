//! Test helper utilities for E2E testing against a running server.

use reqwest::multipart;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

/// Response from POST /api/v1/video/upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

/// Response from POST /api/v1/compare and /api/v1/batch-compare
#[derive(Debug, Serialize, Deserialize)]
pub struct JobAcceptedResponse {
    pub job_id: Uuid,
    pub status: String,
    pub message: String,
}

/// Response from GET /api/v1/jobs/{job_id}
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: String,
    pub progress: u8,
    pub progress_message: Option<String>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Upload a video to the upload endpoint.
pub async fn upload_video(
    client: &reqwest::Client,
    base_url: &str,
    bytes: Vec<u8>,
    filename: &str,
) -> Result<UploadResponse, Box<dyn std::error::Error>> {
    let form = multipart::Form::new().part(
        "file",
        multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str("video/mp4")?,
    );

    let response = client
        .post(format!("{}/api/v1/video/upload", base_url))
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(format!("Upload failed with status {}: {}", status, error_text).into());
    }

    Ok(response.json::<UploadResponse>().await?)
}

/// Submit a single-comparison job.
pub async fn submit_compare(
    client: &reqwest::Client,
    base_url: &str,
    video_id: Uuid,
    prompt: &str,
    models: Option<Vec<&str>>,
) -> Result<JobAcceptedResponse, Box<dyn std::error::Error>> {
    let response = client
        .post(format!("{}/api/v1/compare", base_url))
        .json(&serde_json::json!({
            "video_id": video_id,
            "prompt": prompt,
            "models": models,
        }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(format!("Submit failed with status {}: {}", status, error_text).into());
    }

    Ok(response.json::<JobAcceptedResponse>().await?)
}

/// Poll job status until a terminal state (with timeout).
pub async fn poll_job_status(
    client: &reqwest::Client,
    base_url: &str,
    job_id: Uuid,
    timeout_secs: u64,
) -> Result<JobStatusResponse, Box<dyn std::error::Error>> {
    let max_attempts = timeout_secs * 2; // Poll every 500ms

    for attempt in 0..max_attempts {
        let response = client
            .get(format!("{}/api/v1/jobs/{}", base_url, job_id))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(format!("Status check failed: {}", error_text).into());
        }

        let status_response = response.json::<JobStatusResponse>().await?;

        match status_response.status.as_str() {
            "completed" | "failed" | "cancelled" => return Ok(status_response),
            "pending" | "running" => {
                if attempt % 10 == 0 && attempt > 0 {
                    println!(
                        "  ... {}% {} (attempt {}/{})",
                        status_response.progress,
                        status_response.progress_message.as_deref().unwrap_or(""),
                        attempt,
                        max_attempts
                    );
                }
                sleep(Duration::from_millis(500)).await;
            }
            _ => {
                return Err(format!("Unknown job status: {}", status_response.status).into());
            }
        }
    }

    Err(format!("Job did not complete within {} seconds", timeout_secs).into())
}
