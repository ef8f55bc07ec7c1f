use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExportError {
    #[error("i/o error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to write table: {0}")]
    Table(String),

    #[error("failed to write archive: {0}")]
    Archive(String),

    #[error("invalid export config: {0}")]
    InvalidConfig(String),
}

impl ExportError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        ExportError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Table(err.to_string())
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(err: zip::result::ZipError) -> Self {
        ExportError::Archive(err.to_string())
    }
}
