use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::telemetry::MetricsObserver;
use kvitto::{BatchCoordinator, Encoder, Extractor, KvittoConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Pipeline settings shared by every batch
    pub pipeline: Arc<KvittoConfig>,

    pub encoder: Encoder,
    pub extractor: Extractor,

    /// Render handle of the installed Prometheus recorder
    pub metrics: Option<PrometheusHandle>,
}

impl ServerState {
    /// State backed by ImageMagick and the configured chat-completions endpoint.
    pub fn new(
        config: ServerConfig,
        pipeline: KvittoConfig,
        metrics: Option<PrometheusHandle>,
    ) -> ServerResult<Self> {
        pipeline
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        let encoder = Encoder::with_image_magick(pipeline.raster.clone());
        let extractor = Extractor::from_config(&pipeline.classify)
            .map_err(|e| ServerError::Config(e.to_string()))?;
        Ok(Self::with_components(config, pipeline, encoder, extractor, metrics))
    }

    /// State with caller-supplied pipeline stages.
    pub fn with_components(
        config: ServerConfig,
        pipeline: KvittoConfig,
        encoder: Encoder,
        extractor: Extractor,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            encoder,
            extractor,
            metrics,
        }
    }

    /// A coordinator for one batch, writing rasters under `scratch_dir`.
    pub fn coordinator(&self, scratch_dir: &Path) -> BatchCoordinator {
        BatchCoordinator::new(self.encoder.clone(), self.extractor.clone(), scratch_dir)
            .with_config(self.pipeline.batch.clone())
            .with_observer(Arc::new(MetricsObserver))
    }
}
