//! YAML configuration for the receipt pipeline.
//!
//! Every stage is optional in the file and falls back to its defaults.
//!
//! ## Example
//!
//! ```yaml
//! version: "1.0"
//! name: "office expenses"
//!
//! ingest:
//!   upload_root: "/var/lib/kvitto"
//!   max_file_bytes: 10485760
//!
//! raster:
//!   dpi: 150
//!   quality: 100
//!   program: "magick"
//!
//! classify:
//!   model: "gpt-4o"
//!   max_tokens: 300
//!   timeout_secs: 60
//!   retry:
//!     max_retries: 2
//!
//! batch:
//!   max_concurrency: 8
//!
//! export:
//!   default_owner: "Your name"
//!
//! api_key_env: "OPENAI_API_KEY"
//! ```

use std::fs;
use std::path::Path;

use classify::ClassifyConfig;
use encode::RasterConfig;
use export::ExportConfig;
use ingest::IngestConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::BatchConfig;

/// Environment variable consulted when `api_key_env` is unset.
pub const LEGACY_API_KEY_ENV: &str = "API_KEY";

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct KvittoConfig {
    /// Configuration format version
    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub raster: RasterConfig,

    #[serde(default)]
    pub classify: ClassifyConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub export: ExportConfig,

    /// Environment variable holding the classification API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl KvittoConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: KvittoConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.ingest
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("ingest: {e}")))?;
        self.raster
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("raster: {e}")))?;
        self.classify
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("classify: {e}")))?;
        self.batch
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("batch: {e}")))?;
        self.export
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("export: {e}")))?;
        if self.api_key_env.trim().is_empty() {
            return Err(ConfigLoadError::Validation("api_key_env must not be empty".into()));
        }
        Ok(())
    }

    /// Fills `classify.api_key` from the process environment unless the file
    /// already set one.
    pub fn resolve_api_key(&mut self) {
        self.resolve_api_key_with(|name| std::env::var(name).ok());
    }

    /// [`resolve_api_key`](Self::resolve_api_key) with an explicit lookup.
    /// `api_key_env` is tried first, then [`LEGACY_API_KEY_ENV`].
    pub fn resolve_api_key_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.classify.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
            return;
        }
        self.classify.api_key = [self.api_key_env.as_str(), LEGACY_API_KEY_ENV]
            .into_iter()
            .filter_map(&lookup)
            .find(|key| !key.trim().is_empty());
    }
}

impl Default for KvittoConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            ingest: IngestConfig::default(),
            raster: RasterConfig::default(),
            classify: ClassifyConfig::default(),
            batch: BatchConfig::default(),
            export: ExportConfig::default(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
