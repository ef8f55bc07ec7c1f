use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::{EncodeError, RasterConfig};

/// A single page render, fully described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub page: u32,
    pub dpi: u32,
    pub quality: u8,
    pub sharpen: String,
    pub trim: bool,
    pub flatten: bool,
}

impl RasterRequest {
    pub fn from_config(config: &RasterConfig, source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            output: output.into(),
            page: config.page,
            dpi: config.dpi,
            quality: config.quality,
            sharpen: config.sharpen.clone(),
            trim: true,
            flatten: true,
        }
    }
}

/// Converts one page of a document into a raster image at `request.output`.
///
/// Implementations must not return `Ok` unless the output file was written.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, request: &RasterRequest) -> Result<(), EncodeError>;
}

/// Rasterizer backed by the ImageMagick command line.
#[derive(Debug, Clone)]
pub struct ImageMagick {
    program: String,
}

impl ImageMagick {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn from_config(config: &RasterConfig) -> Self {
        Self::new(config.program.clone())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument vector for `request`, excluding the program name.
    pub fn args(request: &RasterRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-density".into(), request.dpi.to_string().into()];
        if request.trim {
            args.push("-trim".into());
        }
        let mut source = request.source.clone().into_os_string();
        source.push(format!("[{}]", request.page));
        args.push(source);
        args.push("-quality".into());
        args.push(request.quality.to_string().into());
        if request.flatten {
            args.push("-flatten".into());
        }
        if !request.sharpen.is_empty() {
            args.push("-sharpen".into());
            args.push(request.sharpen.clone().into());
        }
        args.push(request.output.clone().into_os_string());
        args
    }
}

impl Default for ImageMagick {
    fn default() -> Self {
        Self::from_config(&RasterConfig::default())
    }
}

#[async_trait]
impl Rasterizer for ImageMagick {
    async fn rasterize(&self, request: &RasterRequest) -> Result<(), EncodeError> {
        let args = Self::args(request);
        debug!(program = %self.program, ?args, "rasterize_start");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| EncodeError::ConversionFailed(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncodeError::ConversionFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Owns a rasterized page on disk and removes it when dropped.
#[derive(Debug)]
pub struct RasterArtifact {
    path: PathBuf,
}

impl RasterArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole image. The file handle is closed before this returns.
    pub async fn read(&self) -> Result<Vec<u8>, EncodeError> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            EncodeError::ConversionFailed(format!(
                "could not read raster output {}: {e}",
                self.path.display()
            ))
        })
    }
}

impl Drop for RasterArtifact {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                debug!(path = %self.path.display(), error = %err, "raster_cleanup_failed");
            }
        }
    }
}
