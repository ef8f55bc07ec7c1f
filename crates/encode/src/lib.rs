//! Receipt payload encoding.
//!
//! [`Encoder::encode`] reads a persisted [`ingest::FileTask`] and produces an
//! [`EncodedPayload`]: standard base64 plus the media type of the bytes that
//! were actually encoded. PDF receipts are first rendered to a JPEG through a
//! [`Rasterizer`]; the bundled [`ImageMagick`] implementation runs the
//! `convert` tool as a child process.
//!
//! ```rust,no_run
//! use encode::{Encoder, RasterConfig};
//! use ingest::{FileTask, TaskId};
//!
//! # async fn run() -> Result<(), encode::EncodeError> {
//! let encoder = Encoder::with_image_magick(RasterConfig::default());
//! let task = FileTask::from_path(TaskId(0), "/tmp/receipt.pdf");
//! let payload = encoder.encode(&task, std::path::Path::new("/tmp")).await?;
//! assert_eq!(payload.media_type.as_str(), "image/jpeg");
//! # Ok(())
//! # }
//! ```

mod config;
mod encoder;
mod error;
mod raster;

pub use config::RasterConfig;
pub use encoder::{EncodedPayload, Encoder};
pub use error::EncodeError;
pub use raster::{ImageMagick, RasterArtifact, RasterRequest, Rasterizer};
