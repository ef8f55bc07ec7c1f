use std::error::Error;
use std::fmt;

use classify::ClassifyError;
use encode::EncodeError;
use ingest::{FileTask, IngestError, TaskId};

/// Category of a batch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A PDF could not be rasterized, or its raster could not be read.
    ConversionFailed,
    /// The classification service failed or answered with unusable output.
    ClassificationFailed,
    /// An upload could not be stored or read back.
    PersistenceFailed,
    /// A pipeline task panicked or the runtime refused to run it.
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConversionFailed => "conversion_failed",
            ErrorKind::ClassificationFailed => "classification_failed",
            ErrorKind::PersistenceFailed => "persistence_failed",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error a failed batch reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchError {
    pub kind: ErrorKind,
    /// Task that failed, when the failure belongs to one.
    pub task_id: Option<TaskId>,
    pub display_name: Option<String>,
    pub message: String,
}

impl BatchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: None,
            display_name: None,
            message: message.into(),
        }
    }

    pub fn for_task(kind: ErrorKind, task: &FileTask, message: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: Some(task.id()),
            display_name: Some(task.display_name().to_string()),
            message: message.into(),
        }
    }

    pub fn from_encode(task: &FileTask, err: &EncodeError) -> Self {
        let kind = match err {
            EncodeError::Read { .. } => ErrorKind::PersistenceFailed,
            _ => ErrorKind::ConversionFailed,
        };
        Self::for_task(kind, task, err.to_string())
    }

    pub fn from_classify(task: &FileTask, err: &ClassifyError) -> Self {
        Self::for_task(ErrorKind::ClassificationFailed, task, err.to_string())
    }

    /// Upload persistence failures, raised before a task exists.
    pub fn from_ingest(task_id: TaskId, file_name: &str, err: &IngestError) -> Self {
        Self {
            kind: ErrorKind::PersistenceFailed,
            task_id: Some(task_id),
            display_name: Some(file_name.to_string()),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.display_name, self.task_id) {
            (Some(name), Some(id)) => write!(f, "{} for {name} (task {id}): {}", self.kind, self.message),
            (None, Some(id)) => write!(f, "{} for task {id}: {}", self.kind, self.message),
            _ => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl Error for BatchError {}
