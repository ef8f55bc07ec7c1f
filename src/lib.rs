//! Workspace umbrella crate for kvitto, concurrent receipt batch processing.
//!
//! A batch of uploaded receipts (images or PDFs) becomes a batch of
//! [`FileTask`]s. The [`BatchCoordinator`] runs one pipeline per task, each
//! encoding the file ([`Encoder`]) and reading its fields through a vision
//! model ([`Extractor`]). The batch resolves to a [`BatchOutcome`]: either
//! every result in an [`Aggregate`], or the first [`BatchError`] observed.
//!
//! ```rust,no_run
//! use kvitto::{BatchCoordinator, BatchOutcome, Encoder, Extractor, KvittoConfig};
//! use kvitto::{BatchWorkspace, FileTask, TaskId};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = KvittoConfig::default();
//! config.resolve_api_key();
//!
//! let workspace = BatchWorkspace::create(&config.ingest)?;
//! let coordinator = BatchCoordinator::new(
//!     Encoder::with_image_magick(config.raster.clone()),
//!     Extractor::from_config(&config.classify)?,
//!     workspace.scratch_dir(),
//! );
//! let tasks = vec![FileTask::from_path(TaskId(0), "receipts/lunch.jpg")];
//! match coordinator.submit(tasks).await {
//!     BatchOutcome::Success(aggregate) => println!("{} receipts", aggregate.len()),
//!     BatchOutcome::Failure(err) => eprintln!("batch failed: {err}"),
//! }
//! # Ok(())
//! # }
//! ```

mod aggregate;
pub mod config;
mod coordinator;
mod error;
mod observer;
mod pipeline;

pub use aggregate::Aggregate;
pub use config::{ConfigLoadError, KvittoConfig};
pub use coordinator::{BatchConfig, BatchCoordinator, BatchOutcome};
pub use error::{BatchError, ErrorKind};
pub use observer::BatchObserver;

pub use classify::{
    Category, ClassificationClient, ClassifyConfig, ClassifyError, ExtractionResult, Extractor,
    OpenAiClient, RetryConfig,
};
pub use encode::{EncodeError, EncodedPayload, Encoder, ImageMagick, RasterConfig, RasterRequest, Rasterizer};
pub use export::{ExportConfig, ExportError, table_file_name, write_archive, write_table};
pub use ingest::{BatchWorkspace, FileTask, IngestConfig, IngestError, MediaType, TaskId, Upload};
