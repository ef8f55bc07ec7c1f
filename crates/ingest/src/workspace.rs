use std::path::{Path, PathBuf};
use std::time::Instant;

use tempfile::TempDir;
use tracing::{info, warn, Instrument, Level};
use uuid::Uuid;

use crate::{FileTask, IngestConfig, IngestError, MediaType, TaskId, Upload};

/// Private directory holding one batch's uploads and scratch files.
///
/// Layout:
///
/// ```text
/// <upload_root>/batch-XXXX/
///     uploads/task-0000/<file name>
///     scratch/
/// ```
///
/// The whole tree is removed when the workspace is dropped, so a batch never
/// leaks files into the next one and concurrent batches never collide.
#[derive(Debug)]
pub struct BatchWorkspace {
    batch_id: Uuid,
    dir: TempDir,
    uploads: PathBuf,
    scratch: PathBuf,
    config: IngestConfig,
}

impl BatchWorkspace {
    /// Creates a fresh workspace under `config.upload_root`.
    pub fn create(config: &IngestConfig) -> Result<Self, IngestError> {
        std::fs::create_dir_all(&config.upload_root)
            .map_err(|e| IngestError::Workspace(e.to_string()))?;
        let dir = tempfile::Builder::new()
            .prefix("batch-")
            .tempdir_in(&config.upload_root)
            .map_err(|e| IngestError::Workspace(e.to_string()))?;

        let uploads = dir.path().join("uploads");
        let scratch = dir.path().join("scratch");
        for sub in [&uploads, &scratch] {
            std::fs::create_dir_all(sub).map_err(|e| IngestError::Workspace(e.to_string()))?;
        }

        Ok(Self {
            batch_id: Uuid::new_v4(),
            dir,
            uploads,
            scratch,
            config: config.clone(),
        })
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory for intermediate files such as rasterized PDF pages.
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }

    /// Writes `upload` to disk and returns the task that refers to it.
    ///
    /// Empty uploads and uploads above `max_file_bytes` are rejected before
    /// anything is written.
    pub async fn persist_upload(&self, id: TaskId, upload: Upload) -> Result<FileTask, IngestError> {
        let span = tracing::span!(
            Level::INFO,
            "kvitto.ingest",
            batch_id = %self.batch_id,
            task_id = %id,
            size = upload.bytes.len()
        );
        self.persist_logged(id, upload).instrument(span).await
    }

    async fn persist_logged(&self, id: TaskId, upload: Upload) -> Result<FileTask, IngestError> {
        let start = Instant::now();
        let result = self.write_upload(id, upload).await;
        let elapsed_micros = start.elapsed().as_micros() as u64;

        match &result {
            Ok(task) => info!(
                display_name = %task.display_name(),
                media_type = %task.declared_media_type(),
                elapsed_micros,
                "upload_persisted"
            ),
            Err(err) => warn!(error = %err, elapsed_micros, "upload_rejected"),
        }
        result
    }

    async fn write_upload(&self, id: TaskId, upload: Upload) -> Result<FileTask, IngestError> {
        let display_name = sanitize_file_name(&upload.file_name, self.config.strip_control_chars)
            .unwrap_or_else(|| id.file_stem());

        if upload.bytes.is_empty() {
            return Err(IngestError::EmptyPayload {
                file_name: display_name,
            });
        }
        if let Some(limit) = self.config.max_file_bytes {
            if upload.bytes.len() > limit {
                return Err(IngestError::PayloadTooLarge {
                    file_name: display_name,
                    size: upload.bytes.len(),
                    limit,
                });
            }
        }

        let task_dir = self.uploads.join(id.file_stem());
        tokio::fs::create_dir_all(&task_dir)
            .await
            .map_err(|e| IngestError::persistence(&task_dir, e))?;
        let location = task_dir.join(&display_name);
        tokio::fs::write(&location, &upload.bytes)
            .await
            .map_err(|e| IngestError::persistence(&location, e))?;

        let media_type = MediaType::resolve(upload.content_type.as_deref(), &display_name);
        Ok(FileTask::new(id, display_name, media_type, location))
    }
}

/// Reduces a client supplied file name to a single safe path component.
///
/// Directory parts are dropped and control characters optionally removed.
/// Returns `None` when nothing usable remains.
///
/// ```rust
/// use ingest::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("../../etc/passwd", true).as_deref(), Some("passwd"));
/// assert_eq!(sanitize_file_name("C:\\scans\\kvitto.jpg", true).as_deref(), Some("kvitto.jpg"));
/// assert_eq!(sanitize_file_name("..", true), None);
/// ```
pub fn sanitize_file_name(raw: &str, strip_control_chars: bool) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = if strip_control_chars {
        last.chars().filter(|c| !c.is_control()).collect()
    } else {
        last.to_string()
    };
    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        None
    } else {
        Some(trimmed.to_string())
    }
}
