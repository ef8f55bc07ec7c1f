//! Error types produced by the ingest crate.
//!
//! Every failure here happens before a file reaches the encoder, so the batch
//! layer reports all of them as a persistence failure. Variants carry strings
//! instead of `std::io::Error` so the type stays `Clone` and comparable.
//!
//! | Error | Client fault | Description |
//! |-------|--------------|-------------|
//! | [`Workspace`](IngestError::Workspace) | no | Batch directory could not be created |
//! | [`Persistence`](IngestError::Persistence) | no | Upload could not be written or opened |
//! | [`EmptyPayload`](IngestError::EmptyPayload) | yes | Upload has zero bytes |
//! | [`PayloadTooLarge`](IngestError::PayloadTooLarge) | yes | Upload exceeds `max_file_bytes` |
use thiserror::Error;

/// Errors raised while preparing uploads for a batch.
///
/// ```rust
/// use ingest::IngestError;
///
/// let err = IngestError::EmptyPayload { file_name: "receipt.jpg".into() };
/// assert_eq!(err.to_string(), "upload receipt.jpg is empty");
/// assert!(err.is_client_error());
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// The per-batch directory could not be created under the upload root.
    #[error("failed to prepare batch workspace: {0}")]
    Workspace(String),

    /// Writing the upload to disk (or reopening it) failed.
    #[error("failed to persist {path}: {message}")]
    Persistence { path: String, message: String },

    /// The upload carried no bytes.
    #[error("upload {file_name} is empty")]
    EmptyPayload { file_name: String },

    /// The upload is larger than the configured limit.
    #[error("upload {file_name} is {size} bytes, limit is {limit}")]
    PayloadTooLarge {
        file_name: String,
        size: usize,
        limit: usize,
    },
}

impl IngestError {
    pub(crate) fn persistence(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        IngestError::Persistence {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Returns true when the upload itself was unacceptable.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::EmptyPayload { .. } | IngestError::PayloadTooLarge { .. }
        )
    }
}
