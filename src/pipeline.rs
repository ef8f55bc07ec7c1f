use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use classify::{ExtractionResult, Extractor};
use encode::Encoder;
use ingest::FileTask;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::observer::{BatchObserver, ObserverSpan};
use crate::{BatchError, ErrorKind};

/// Everything a pipeline needs, shared by all pipelines of one batch.
pub(crate) struct PipelineContext {
    pub(crate) encoder: Encoder,
    pub(crate) extractor: Extractor,
    pub(crate) scratch_dir: PathBuf,
    pub(crate) observer: Option<Arc<dyn BatchObserver>>,
    pub(crate) limiter: Option<Arc<Semaphore>>,
}

/// Encoder then Extractor for one task. The task is consumed here and
/// dropped when this returns.
pub(crate) async fn run_pipeline(
    task: FileTask,
    ctx: &PipelineContext,
) -> Result<ExtractionResult, BatchError> {
    let _permit = match &ctx.limiter {
        Some(limiter) => Some(Arc::clone(limiter).acquire_owned().await.map_err(|_| {
            BatchError::for_task(ErrorKind::Internal, &task, "concurrency limiter closed")
        })?),
        None => None,
    };

    let start = Instant::now();
    let result = encode_and_extract(&task, ctx).await;
    let elapsed_micros = start.elapsed().as_micros() as u64;

    match &result {
        Ok(extracted) => info!(
            company = %extracted.company_name,
            cost = extracted.cost,
            elapsed_micros,
            "pipeline_success"
        ),
        Err(err) => warn!(kind = %err.kind, error = %err.message, elapsed_micros, "pipeline_failure"),
    }
    result
}

async fn encode_and_extract(
    task: &FileTask,
    ctx: &PipelineContext,
) -> Result<ExtractionResult, BatchError> {
    let encode_span = ObserverSpan::start(ctx.observer.as_ref());
    let encoded = ctx.encoder.encode(task, &ctx.scratch_dir).await;
    if let Some(span) = encode_span {
        span.record_encode(encoded.as_ref().map(|_| ()).map_err(Clone::clone));
    }
    let payload = encoded.map_err(|err| BatchError::from_encode(task, &err))?;

    let extract_span = ObserverSpan::start(ctx.observer.as_ref());
    let extracted = ctx.extractor.extract(&payload, task.location()).await;
    if let Some(span) = extract_span {
        span.record_extract(extracted.as_ref().map(|_| ()).map_err(Clone::clone));
    }
    extracted.map_err(|err| BatchError::from_classify(task, &err))
}
