use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use classify::Extractor;
use encode::Encoder;
use futures::FutureExt;
use futures::future::join_all;
use ingest::FileTask;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinError;
use tracing::{Instrument, Level, debug, info, warn};

use crate::aggregate::{Aggregate, AggregateSink};
use crate::observer::{BatchObserver, ObserverSpan};
use crate::pipeline::{PipelineContext, run_pipeline};
use crate::{BatchError, ErrorKind};

/// Batch-level tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Pipelines allowed to encode or classify at the same time. `None`
    /// runs every pipeline at once. Each task still gets its own task.
    pub max_concurrency: Option<usize>,
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == Some(0) {
            return Err("max_concurrency must be greater than zero when set".into());
        }
        Ok(())
    }
}

/// How a batch resolved. Exactly one of the two is ever produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every pipeline succeeded.
    Success(Aggregate),
    /// The first failure the coordinator observed.
    Failure(BatchError),
}

impl BatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<Aggregate, BatchError> {
        match self {
            BatchOutcome::Success(aggregate) => Ok(aggregate),
            BatchOutcome::Failure(err) => Err(err),
        }
    }
}

/// Runs one encode then extract pipeline per file task, concurrently.
///
/// [`submit`](Self::submit) consumes the coordinator, so a coordinator
/// resolves exactly one batch.
///
/// # Failure semantics
///
/// The first failure the coordinator receives decides the batch, and the
/// coordinator returns without waiting for the other pipelines. Which
/// failure that is, when several pipelines fail, depends on timing: any of
/// them may be reported, and none is ever silently dropped in favor of a
/// success. A panicking pipeline counts as an [`ErrorKind::Internal`]
/// failure and is reported the same way. Pipelines still in flight are
/// detached rather than aborted. They run to completion and whatever they
/// produce is discarded.
pub struct BatchCoordinator {
    encoder: Encoder,
    extractor: Extractor,
    scratch_dir: PathBuf,
    config: BatchConfig,
    observer: Option<Arc<dyn BatchObserver>>,
}

enum Settled {
    Failed(BatchError),
    Joined(Vec<Result<(), JoinError>>),
}

impl BatchCoordinator {
    /// `scratch_dir` receives intermediate rasters; it should belong to the
    /// batch (see [`ingest::BatchWorkspace::scratch_dir`]).
    pub fn new(encoder: Encoder, extractor: Extractor, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            encoder,
            extractor,
            scratch_dir: scratch_dir.into(),
            config: BatchConfig::default(),
            observer: None,
        }
    }

    pub fn with_config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Processes `tasks` and resolves the batch.
    ///
    /// Must be called from within a Tokio runtime. An empty batch succeeds
    /// immediately without spawning anything.
    pub async fn submit(self, tasks: Vec<FileTask>) -> BatchOutcome {
        let span = tracing::span!(Level::INFO, "kvitto.batch", batch_size = tasks.len());
        self.run(tasks).instrument(span).await
    }

    async fn run(self, tasks: Vec<FileTask>) -> BatchOutcome {
        let start = Instant::now();
        let outcome_span = ObserverSpan::start(self.observer.as_ref());
        let batch_size = tasks.len();

        let outcome = if tasks.is_empty() {
            BatchOutcome::Success(Aggregate::default())
        } else {
            self.fan_out(tasks).await
        };

        let elapsed_micros = start.elapsed().as_micros() as u64;
        match &outcome {
            BatchOutcome::Success(aggregate) => {
                info!(batch_size, results = aggregate.len(), elapsed_micros, "batch_success")
            }
            BatchOutcome::Failure(err) => warn!(
                batch_size,
                kind = %err.kind,
                task_id = ?err.task_id.map(|id| id.0),
                error = %err.message,
                elapsed_micros,
                "batch_failure"
            ),
        }
        if let Some(span) = outcome_span {
            span.record_outcome(match &outcome {
                BatchOutcome::Success(aggregate) => Ok(aggregate.len()),
                BatchOutcome::Failure(err) => Err(err.kind),
            });
        }
        outcome
    }

    async fn fan_out(self, tasks: Vec<FileTask>) -> BatchOutcome {
        let ctx = Arc::new(PipelineContext {
            encoder: self.encoder,
            extractor: self.extractor,
            scratch_dir: self.scratch_dir,
            limiter: self.config.max_concurrency.map(|n| Arc::new(Semaphore::new(n))),
            observer: self.observer,
        });
        let sink = AggregateSink::new();
        // One slot: the first failure is kept, later ones are dropped.
        let (failure_tx, mut failure_rx) = mpsc::channel::<BatchError>(1);

        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let ctx = Arc::clone(&ctx);
                let sink = sink.clone();
                let failures = failure_tx.clone();
                if let Some(observer) = &ctx.observer {
                    observer.record_spawned(task.id());
                }
                let span = tracing::span!(
                    Level::INFO,
                    "kvitto.pipeline",
                    task_id = task.id().0,
                    display_name = %task.display_name()
                );
                tokio::spawn(
                    async move {
                        let task_id = task.id();
                        let display_name = task.display_name().to_string();
                        let failure = match AssertUnwindSafe(run_pipeline(task, &ctx))
                            .catch_unwind()
                            .await
                        {
                            Ok(Ok(result)) => {
                                sink.append(result);
                                return;
                            }
                            Ok(Err(err)) => err,
                            Err(payload) => BatchError {
                                kind: ErrorKind::Internal,
                                task_id: Some(task_id),
                                display_name: Some(display_name),
                                message: format!("pipeline panicked: {}", panic_message(&*payload)),
                            },
                        };
                        if failures.try_send(failure).is_err() {
                            debug!("failure_discarded");
                        }
                    }
                    .instrument(span),
                )
            })
            .collect();
        // Only pipelines hold senders now; recv yields None once all finish.
        drop(failure_tx);

        let settled = tokio::select! {
            biased;
            Some(err) = failure_rx.recv() => Settled::Failed(err),
            joined = join_all(handles) => Settled::Joined(joined),
        };

        match settled {
            Settled::Failed(err) => BatchOutcome::Failure(err),
            Settled::Joined(joined) => {
                if let Ok(err) = failure_rx.try_recv() {
                    return BatchOutcome::Failure(err);
                }
                // Panics arrive through the failure slot; this covers cancelled tasks.
                if let Some(join_err) = joined.into_iter().find_map(Result::err) {
                    return BatchOutcome::Failure(BatchError::new(
                        ErrorKind::Internal,
                        format!("pipeline task did not complete: {join_err}"),
                    ));
                }
                BatchOutcome::Success(sink.take())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl std::fmt::Debug for BatchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchCoordinator")
            .field("scratch_dir", &self.scratch_dir)
            .field("config", &self.config)
            .field("observed", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}
