use std::sync::Arc;
use std::time::{Duration, Instant};

use classify::ClassifyError;
use encode::EncodeError;
use ingest::TaskId;

use crate::ErrorKind;

/// Metrics observer for batch and pipeline stages.
///
/// Installed per coordinator with
/// [`BatchCoordinator::with_observer`](crate::BatchCoordinator::with_observer).
pub trait BatchObserver: Send + Sync {
    fn record_spawned(&self, _task_id: TaskId) {}
    fn record_encode(&self, latency: Duration, result: Result<(), EncodeError>);
    fn record_extract(&self, latency: Duration, result: Result<(), ClassifyError>);
    /// `Ok` carries the number of results in the aggregate.
    fn record_outcome(&self, latency: Duration, result: Result<usize, ErrorKind>);
}

pub(crate) struct ObserverSpan {
    recorder: Arc<dyn BatchObserver>,
    start: Instant,
}

impl ObserverSpan {
    pub(crate) fn start(observer: Option<&Arc<dyn BatchObserver>>) -> Option<Self> {
        observer.map(|recorder| Self {
            recorder: Arc::clone(recorder),
            start: Instant::now(),
        })
    }

    pub(crate) fn record_encode(self, result: Result<(), EncodeError>) {
        self.recorder.record_encode(self.start.elapsed(), result);
    }

    pub(crate) fn record_extract(self, result: Result<(), ClassifyError>) {
        self.recorder.record_extract(self.start.elapsed(), result);
    }

    pub(crate) fn record_outcome(self, result: Result<usize, ErrorKind>) {
        self.recorder.record_outcome(self.start.elapsed(), result);
    }
}
