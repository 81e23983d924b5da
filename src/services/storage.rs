use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::video::VideoMetadata;

/// Local-disk storage for uploaded videos.
///
/// Files are stored as `{video_id}{ext}` so a video can still be resolved
/// after a restart, when the in-memory metadata index is gone.
pub struct VideoStorage {
    dir: PathBuf,
    index: RwLock<HashMap<Uuid, VideoMetadata>>,
}

impl VideoStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(StorageError::Io)?;
        Ok(Self {
            dir,
            index: RwLock::new(HashMap::new()),
        })
    }

    /// Allocate an id and on-disk path for a new upload.
    pub fn allocate(&self, original_filename: &str) -> (Uuid, PathBuf) {
        let video_id = Uuid::new_v4();
        let ext = Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| ".mp4".to_string());
        let path = self.dir.join(format!("{video_id}{ext}"));
        (video_id, path)
    }

    /// Register a fully written upload in the metadata index.
    pub async fn commit(&self, metadata: VideoMetadata) {
        self.index.write().await.insert(metadata.id, metadata);
    }

    /// Remove a partially written upload.
    pub async fn discard(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial upload");
            }
        }
    }

    /// Resolve a video id to its file path.
    ///
    /// Falls back to a directory scan when the id is not in the index, so
    /// videos uploaded before a restart remain usable.
    pub async fn resolve(&self, video_id: Uuid) -> Result<Option<PathBuf>, StorageError> {
        if let Some(meta) = self.index.read().await.get(&video_id) {
            if tokio::fs::try_exists(&meta.path).await.map_err(StorageError::Io)? {
                return Ok(Some(meta.path.clone()));
            }
            return Ok(None);
        }

        let prefix = video_id.to_string();
        let mut dir = tokio::fs::read_dir(&self.dir).await.map_err(StorageError::Io)?;
        while let Some(entry) = dir.next_entry().await.map_err(StorageError::Io)? {
            let path = entry.path();
            let stem = path.file_stem().and_then(|s| s.to_str());
            if stem == Some(prefix.as_str()) {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    pub async fn metadata(&self, video_id: Uuid) -> Option<VideoMetadata> {
        self.index.read().await.get(&video_id).cloned()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// MIME type hint derived from the filename extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        _ => "video/mp4",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Video storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
