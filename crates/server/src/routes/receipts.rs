//! `POST /api/v1/receipts`
//!
//! Multipart form: every field with a file name is a receipt, and the text
//! field `name` sets the owner printed on the expense table. The response is
//! a zip with the receipts and the table.

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use kvitto::{
    write_archive, write_table, Aggregate, BatchError, BatchWorkspace, ErrorKind, FileTask,
    TaskId, Upload,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub const OWNER_FIELD: &str = "name";
pub const ARCHIVE_NAME: &str = "receipts.zip";

/// Parsed upload form.
struct ReceiptForm {
    tasks: Vec<FileTask>,
    owner: Option<String>,
}

pub async fn submit_receipts(
    State(state): State<Arc<ServerState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Response> {
    let start = Instant::now();
    let mut multipart = multipart?;

    let workspace = BatchWorkspace::create(&state.pipeline.ingest)
        .map_err(|err| BatchError::new(ErrorKind::PersistenceFailed, err.to_string()))?;
    let form = read_form(&workspace, &mut multipart).await?;
    let file_count = form.tasks.len();
    info!(batch_id = %workspace.batch_id(), files = file_count, "receipt_batch_received");

    let aggregate = state
        .coordinator(workspace.scratch_dir())
        .submit(form.tasks)
        .await
        .into_result()?;

    let owner = state
        .pipeline
        .export
        .owner_or_default(form.owner.as_deref())
        .to_string();
    let archive_path = export(aggregate, owner, workspace.path().to_path_buf()).await?;
    let body = tokio::fs::read(&archive_path).await?;

    info!(
        batch_id = %workspace.batch_id(),
        files = file_count,
        archive_bytes = body.len(),
        elapsed_micros = start.elapsed().as_micros() as u64,
        "receipt_batch_exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"receipts.zip\"",
            ),
        ],
        body,
    )
        .into_response())
}

async fn read_form(
    workspace: &BatchWorkspace,
    multipart: &mut Multipart,
) -> ServerResult<ReceiptForm> {
    let mut tasks = Vec::new();
    let mut owner = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        let Some(file_name) = field.file_name().map(str::to_string) else {
            if field_name == OWNER_FIELD {
                owner = Some(field.text().await?);
            } else {
                debug!(field = %field_name, "ignoring_form_field");
            }
            continue;
        };

        let id = u32::try_from(tasks.len())
            .map(TaskId)
            .map_err(|_| ServerError::BadRequest("too many files in one batch".into()))?;
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        let task = workspace
            .persist_upload(id, Upload::new(file_name.clone(), content_type, bytes))
            .await
            .map_err(|err| {
                if err.is_client_error() {
                    ServerError::BadRequest(err.to_string())
                } else {
                    BatchError::from_ingest(id, &file_name, &err).into()
                }
            })?;
        tasks.push(task);
    }

    Ok(ReceiptForm { tasks, owner })
}

/// Writes the table and the archive into `dir` off the async runtime.
async fn export(aggregate: Aggregate, owner: String, dir: PathBuf) -> ServerResult<PathBuf> {
    tokio::task::spawn_blocking(move || -> ServerResult<PathBuf> {
        let table = write_table(&aggregate, &owner, &dir)?;
        Ok(write_archive(&aggregate, &table, &dir.join(ARCHIVE_NAME))?)
    })
    .await
    .map_err(|err| ServerError::Internal(format!("export task failed: {err}")))?
}
