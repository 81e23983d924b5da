use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Metadata for an uploaded video file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: Uuid,
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub path: PathBuf,
}
