//! Prometheus metrics for batches served over HTTP.
//!
//! [`MetricsObserver`] forwards coordinator events to the `metrics` facade.
//! Whatever recorder is installed globally receives them; without one they
//! are dropped.

use std::time::Duration;

use kvitto::{BatchObserver, ClassifyError, EncodeError, ErrorKind, TaskId};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const PIPELINES_SPAWNED: &str = "kvitto_pipelines_spawned_total";
pub const ENCODE_SECONDS: &str = "kvitto_encode_duration_seconds";
pub const EXTRACT_SECONDS: &str = "kvitto_extract_duration_seconds";
pub const BATCH_SECONDS: &str = "kvitto_batch_duration_seconds";
pub const BATCHES: &str = "kvitto_batches_total";
pub const RECEIPTS: &str = "kvitto_receipts_total";

/// Installs the global Prometheus recorder and returns its render handle.
pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

fn status<E>(result: &Result<(), E>) -> &'static str {
    if result.is_ok() {
        "ok"
    } else {
        "error"
    }
}

impl BatchObserver for MetricsObserver {
    fn record_spawned(&self, _task_id: TaskId) {
        counter!(PIPELINES_SPAWNED).increment(1);
    }

    fn record_encode(&self, latency: Duration, result: Result<(), EncodeError>) {
        histogram!(ENCODE_SECONDS, "status" => status(&result)).record(latency.as_secs_f64());
    }

    fn record_extract(&self, latency: Duration, result: Result<(), ClassifyError>) {
        let retryable = result.as_ref().err().is_some_and(ClassifyError::is_retryable);
        histogram!(EXTRACT_SECONDS, "status" => status(&result)).record(latency.as_secs_f64());
        if retryable {
            counter!("kvitto_extract_retryable_failures_total").increment(1);
        }
    }

    fn record_outcome(&self, latency: Duration, result: Result<usize, ErrorKind>) {
        let outcome = match &result {
            Ok(_) => "success",
            Err(kind) => kind.as_str(),
        };
        counter!(BATCHES, "outcome" => outcome).increment(1);
        histogram!(BATCH_SECONDS, "outcome" => outcome).record(latency.as_secs_f64());
        if let Ok(count) = result {
            counter!(RECEIPTS).increment(count as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    fn local_recorder() -> PrometheusRecorder {
        PrometheusBuilder::new().build_recorder()
    }

    #[test]
    fn outcome_counters_render() {
        let recorder = local_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            let observer = MetricsObserver;
            observer.record_spawned(TaskId(0));
            observer.record_outcome(Duration::from_millis(40), Ok(3));
            observer.record_outcome(Duration::from_millis(5), Err(ErrorKind::ClassificationFailed));
        });

        let text = handle.render();
        assert!(text.contains("kvitto_pipelines_spawned_total 1"));
        assert!(text.contains("kvitto_receipts_total 3"));
        assert!(text.contains(r#"kvitto_batches_total{outcome="success"} 1"#));
        assert!(text.contains(r#"kvitto_batches_total{outcome="classification_failed"} 1"#));
    }

    #[test]
    fn retryable_extract_failures_are_counted() {
        let recorder = local_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            let observer = MetricsObserver;
            observer.record_extract(
                Duration::from_millis(1),
                Err(ClassifyError::Status {
                    status: 503,
                    body: String::new(),
                }),
            );
            observer.record_extract(
                Duration::from_millis(1),
                Err(ClassifyError::Status {
                    status: 401,
                    body: String::new(),
                }),
            );
        });

        assert!(handle
            .render()
            .contains("kvitto_extract_retryable_failures_total 1"));
    }
}
