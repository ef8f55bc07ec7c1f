//! Configuration for upload persistence.
//!
//! [`IngestConfig`] is cheap to clone and deserializes from any serde format,
//! which is how the umbrella crate embeds it in the pipeline YAML file.
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("defaults are valid");
//! assert!(config.max_file_bytes.is_none());
//! ```
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime configuration for how uploads are stored before processing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestConfig {
    /// Configuration schema version. Must be at least 1.
    pub version: u32,

    /// Directory under which every batch gets its own private subdirectory.
    ///
    /// Created on demand. Default: `<system temp>/kvitto`.
    pub upload_root: PathBuf,

    /// Largest single upload accepted, in bytes. `None` means unlimited; the
    /// HTTP layer still caps the total request body.
    pub max_file_bytes: Option<usize>,

    /// Strip control characters from client supplied file names.
    pub strip_control_chars: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: 1,
            upload_root: std::env::temp_dir().join("kvitto"),
            max_file_bytes: None,
            strip_control_chars: true,
        }
    }
}

/// Errors reported by [`IngestConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("ingest config version must be >= 1, got {0}")]
    UnsupportedVersion(u32),

    #[error("max_file_bytes must be greater than zero when set")]
    ZeroFileLimit,

    #[error("upload_root must not be empty")]
    EmptyUploadRoot,
}

impl IngestConfig {
    /// Checks internal consistency. Performs no I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        if self.max_file_bytes == Some(0) {
            return Err(ConfigError::ZeroFileLimit);
        }
        if self.upload_root.as_os_str().is_empty() {
            return Err(ConfigError::EmptyUploadRoot);
        }
        Ok(())
    }
}
