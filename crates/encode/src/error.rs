use thiserror::Error;

/// Failures while turning a file task into a transportable payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EncodeError {
    /// The rasterizer exited unsuccessfully or its output could not be read.
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    /// The persisted upload could not be read back.
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid raster configuration: {0}")]
    InvalidConfig(String),
}

impl EncodeError {
    pub(crate) fn read(path: &std::path::Path, err: std::io::Error) -> Self {
        EncodeError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}
