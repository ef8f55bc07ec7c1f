use serde::{Deserialize, Serialize};

use crate::EncodeError;

/// Rasterization settings applied to PDF receipts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RasterConfig {
    /// Render density in dots per inch.
    pub dpi: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
    /// `-sharpen` geometry passed to ImageMagick.
    pub sharpen: String,
    /// Zero based page to render.
    pub page: u32,
    /// ImageMagick entry point. `convert` on IM6, `magick` on IM7.
    pub program: String,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            quality: 100,
            sharpen: "0x1.0".to_string(),
            page: 0,
            program: "convert".to_string(),
        }
    }
}

impl RasterConfig {
    pub fn validate(&self) -> Result<(), EncodeError> {
        if self.dpi == 0 {
            return Err(EncodeError::InvalidConfig("dpi must be greater than zero".into()));
        }
        if self.quality == 0 || self.quality > 100 {
            return Err(EncodeError::InvalidConfig(format!(
                "quality must be in 1..=100, got {}",
                self.quality
            )));
        }
        if self.program.trim().is_empty() {
            return Err(EncodeError::InvalidConfig("program must not be empty".into()));
        }
        Ok(())
    }
}
