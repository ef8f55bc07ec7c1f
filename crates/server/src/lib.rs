//! Kvitto Server - HTTP API for receipt batches
//!
//! Clients upload a batch of receipts (JPEG, PNG or PDF) and receive a zip
//! holding the receipts plus an expense table. The batch succeeds or fails as
//! a whole: one unreadable receipt fails the request.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /metrics` - Prometheus metrics
//! - `POST /api/v1/receipts` - Multipart receipt upload, answers `application/zip`
//!
//! Errors use one body shape:
//!
//! ```json
//! { "error": { "code": "CLASSIFICATION_FAILED", "message": "..." } }
//! ```
//!
//! | Failure              | Status |
//! |----------------------|--------|
//! | malformed multipart  | 400    |
//! | body too large       | 413    |
//! | conversion failed    | 422    |
//! | classification failed| 502    |
//! | persistence, export, internal | 500 |

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
pub use telemetry::MetricsObserver;
