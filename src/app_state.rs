use std::sync::Arc;

use crate::services::pipeline::ComparisonPipeline;
use crate::services::queue::JobQueue;
use crate::services::storage::VideoStorage;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub videos: Arc<VideoStorage>,
    pub pipeline: Arc<ComparisonPipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        queue: Arc<JobQueue>,
        videos: Arc<VideoStorage>,
        pipeline: Arc<ComparisonPipeline>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            queue,
            videos,
            pipeline,
            max_upload_bytes,
        }
    }
}
