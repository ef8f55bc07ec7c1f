//! # Kvitto Ingest Crate
//!
//! Turns uploaded receipt files into [`FileTask`]s that the batch pipeline can
//! consume. The crate owns three concerns:
//!
//! - the task model ([`FileTask`], [`TaskId`], [`MediaType`]);
//! - a per-batch on-disk [`BatchWorkspace`] that is removed when dropped;
//! - validation of incoming [`Upload`]s against [`IngestConfig`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ingest::{BatchWorkspace, IngestConfig, TaskId, Upload};
//!
//! # async fn run() -> Result<(), ingest::IngestError> {
//! let workspace = BatchWorkspace::create(&IngestConfig::default())?;
//! let task = workspace
//!     .persist_upload(TaskId(0), Upload::new("lunch.jpg", Some("image/jpeg".into()), vec![0xFF, 0xD8]))
//!     .await?;
//! assert_eq!(task.display_name(), "lunch.jpg");
//! # Ok(())
//! # }
//! ```
//!
//! Logging uses `tracing`: each persisted upload emits `upload_persisted` or
//! `upload_rejected` inside a `kvitto.ingest` span.

mod config;
mod error;
mod types;
mod workspace;

pub use config::{ConfigError, IngestConfig};
pub use error::IngestError;
pub use types::{FileTask, MediaType, TaskId, Upload};
pub use workspace::{sanitize_file_name, BatchWorkspace};
