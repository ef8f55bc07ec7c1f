use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ingest::{FileTask, MediaType};
use tracing::{debug, warn};

use crate::{EncodeError, ImageMagick, RasterArtifact, RasterConfig, RasterRequest, Rasterizer};

/// Base64 payload ready for the classification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Standard alphabet, padded.
    pub data: String,
    /// Type of the encoded bytes; `image/jpeg` whenever a PDF was rasterized.
    pub media_type: MediaType,
}

impl EncodedPayload {
    pub fn from_bytes(bytes: &[u8], media_type: MediaType) -> Self {
        Self {
            data: STANDARD.encode(bytes),
            media_type,
        }
    }

    /// `data:<media type>;base64,<data>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Turns file tasks into [`EncodedPayload`]s.
///
/// PDFs go through the configured [`Rasterizer`] first; everything else is
/// encoded byte for byte. Cheap to clone and safe to share across pipelines.
#[derive(Clone)]
pub struct Encoder {
    rasterizer: Arc<dyn Rasterizer>,
    config: RasterConfig,
}

impl Encoder {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, config: RasterConfig) -> Self {
        Self { rasterizer, config }
    }

    /// Encoder that shells out to ImageMagick as configured.
    pub fn with_image_magick(config: RasterConfig) -> Self {
        Self::new(Arc::new(ImageMagick::from_config(&config)), config)
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Encodes `task`, writing any intermediate raster under `scratch_dir`.
    ///
    /// The raster file is named after the task id, so concurrent pipelines
    /// sharing a scratch directory never overwrite each other.
    pub async fn encode(&self, task: &FileTask, scratch_dir: &Path) -> Result<EncodedPayload, EncodeError> {
        let start = Instant::now();
        let result = if task.declared_media_type().is_pdf() {
            self.encode_pdf(task, scratch_dir).await
        } else {
            self.encode_direct(task).await
        };
        let elapsed_micros = start.elapsed().as_micros() as u64;

        match &result {
            Ok(payload) => debug!(
                task_id = %task.id(),
                media_type = %payload.media_type,
                encoded_len = payload.data.len(),
                elapsed_micros,
                "encode_success"
            ),
            Err(err) => warn!(task_id = %task.id(), error = %err, elapsed_micros, "encode_failure"),
        }
        result
    }

    async fn encode_direct(&self, task: &FileTask) -> Result<EncodedPayload, EncodeError> {
        let bytes = tokio::fs::read(task.location())
            .await
            .map_err(|e| EncodeError::read(task.location(), e))?;
        Ok(EncodedPayload::from_bytes(
            &bytes,
            task.declared_media_type().clone(),
        ))
    }

    async fn encode_pdf(&self, task: &FileTask, scratch_dir: &Path) -> Result<EncodedPayload, EncodeError> {
        let output = scratch_dir.join(format!("{}.jpg", task.id().file_stem()));
        let request = RasterRequest::from_config(&self.config, task.location(), &output);

        // Guard before the call so a partial output is removed on failure too.
        let artifact = RasterArtifact::new(output);
        self.rasterizer.rasterize(&request).await?;
        let bytes = artifact.read().await?;
        Ok(EncodedPayload::from_bytes(&bytes, MediaType::jpeg()))
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder").field("config", &self.config).finish_non_exhaustive()
    }
}
