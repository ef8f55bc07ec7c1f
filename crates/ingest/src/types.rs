use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Position of an upload within its batch.
///
/// Stable for the life of the batch and used to name per-task files, so two
/// uploads with the same display name never share a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl TaskId {
    /// Zero padded form used in file and directory names, e.g. `task-0007`.
    pub fn file_stem(&self) -> String {
        format!("task-{:04}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized MIME essence: lowercase, parameters stripped.
///
/// ```rust
/// use ingest::MediaType;
///
/// let mt = MediaType::new(" Image/JPG; charset=binary");
/// assert_eq!(mt.as_str(), "image/jpeg");
/// assert!(MediaType::resolve(None, "scan.PDF").is_pdf());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaType(String);

impl MediaType {
    pub const PDF: &'static str = "application/pdf";
    pub const JPEG: &'static str = "image/jpeg";
    pub const OCTET_STREAM: &'static str = "application/octet-stream";

    pub fn new(raw: &str) -> Self {
        let essence = raw.split(';').next().unwrap_or_default().trim();
        let lowered = essence.to_ascii_lowercase();
        let canonical = match lowered.as_str() {
            "image/jpg" | "image/pjpeg" => Self::JPEG.to_string(),
            "application/x-pdf" => Self::PDF.to_string(),
            "" => Self::OCTET_STREAM.to_string(),
            _ => lowered,
        };
        Self(canonical)
    }

    pub fn pdf() -> Self {
        Self(Self::PDF.to_string())
    }

    pub fn jpeg() -> Self {
        Self(Self::JPEG.to_string())
    }

    /// Media type implied by a file extension, if it is one we recognize.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let mt = match ext.to_ascii_lowercase().as_str() {
            "pdf" => Self::PDF,
            "jpg" | "jpeg" => Self::JPEG,
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            _ => return None,
        };
        Some(Self(mt.to_string()))
    }

    /// Picks the declared type unless it is missing or generic, in which
    /// case the file name's extension decides.
    pub fn resolve(declared: Option<&str>, file_name: &str) -> Self {
        let declared = declared.map(Self::new);
        match declared {
            Some(mt) if mt.as_str() != Self::OCTET_STREAM => mt,
            other => Path::new(file_name)
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(Self::from_extension)
                .or(other)
                .unwrap_or_else(|| Self(Self::OCTET_STREAM.to_string())),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.0 == Self::PDF
    }

    pub fn is_image(&self) -> bool {
        self.0.starts_with("image/")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One uploaded file, persisted and ready for a pipeline.
///
/// Immutable once built. It is deliberately not `Clone`: each task is moved
/// into exactly one pipeline.
#[derive(Debug, PartialEq, Eq)]
pub struct FileTask {
    id: TaskId,
    display_name: String,
    declared_media_type: MediaType,
    location: PathBuf,
}

impl FileTask {
    pub fn new(
        id: TaskId,
        display_name: impl Into<String>,
        declared_media_type: MediaType,
        location: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            declared_media_type,
            location: location.into(),
        }
    }

    /// Builds a task for a file that already exists on disk, inferring the
    /// media type from its extension.
    pub fn from_path(id: TaskId, location: impl Into<PathBuf>) -> Self {
        let location = location.into();
        let display_name = location
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| id.file_stem());
        let media_type = MediaType::resolve(None, &display_name);
        Self::new(id, display_name, media_type, location)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn declared_media_type(&self) -> &MediaType {
        &self.declared_media_type
    }

    /// Path of the persisted copy; the handle the encoder reads from.
    pub fn location(&self) -> &Path {
        &self.location
    }
}

/// A file part received from a client, not yet written to disk.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes: bytes.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_strips_parameters_and_case() {
        assert_eq!(MediaType::new("APPLICATION/PDF; q=1").as_str(), MediaType::PDF);
        assert_eq!(MediaType::new("image/png").as_str(), "image/png");
        assert_eq!(MediaType::new("  ").as_str(), MediaType::OCTET_STREAM);
    }

    #[test]
    fn resolve_prefers_declared_type() {
        let mt = MediaType::resolve(Some("image/png"), "receipt.pdf");
        assert_eq!(mt.as_str(), "image/png");
    }

    #[test]
    fn resolve_falls_back_to_extension() {
        assert!(MediaType::resolve(Some("application/octet-stream"), "a.pdf").is_pdf());
        assert_eq!(MediaType::resolve(None, "b.JPEG").as_str(), MediaType::JPEG);
        assert_eq!(
            MediaType::resolve(None, "notes.txt").as_str(),
            MediaType::OCTET_STREAM
        );
    }

    #[test]
    fn file_task_from_path_infers_name_and_type() {
        let task = FileTask::from_path(TaskId(3), "/data/scan.pdf");
        assert_eq!(task.id(), TaskId(3));
        assert_eq!(task.display_name(), "scan.pdf");
        assert!(task.declared_media_type().is_pdf());
        assert_eq!(task.location(), Path::new("/data/scan.pdf"));
    }

    #[test]
    fn task_id_file_stem_is_padded() {
        assert_eq!(TaskId(7).file_stem(), "task-0007");
        assert_eq!(TaskId(7).to_string(), "7");
    }
}
