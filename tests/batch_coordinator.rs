//! Batch coordinator behavior with scripted collaborators.
//!
//! The fake classification client decodes the image it receives and follows
//! the instruction written in it:
//!
//! - `ok:<company>:<cost>` answers with a valid extraction
//! - `delay:<ms>:<company>` the same, after sleeping
//! - `status:<code>` fails with that HTTP status
//! - `garbage` answers 200 with non-JSON content
//! - `hang` never answers
//! - `panic` panics inside the pipeline

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use classify::{ChatRequest, ChatResponse, Choice, ClassifyError, ContentPart, ResponseMessage};
use kvitto::{
    BatchConfig, BatchCoordinator, BatchObserver, BatchOutcome, ClassificationClient, EncodeError,
    Encoder, ErrorKind, Extractor, FileTask, MediaType, RasterConfig, RasterRequest, Rasterizer,
    TaskId,
};

#[derive(Default)]
struct ScriptedClient {
    requests: Mutex<Vec<ChatRequest>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

fn image_url(request: &ChatRequest) -> String {
    request.messages[0]
        .content
        .iter()
        .find_map(|part| match part {
            ContentPart::ImageUrl { image_url } => Some(image_url.url.clone()),
            _ => None,
        })
        .expect("request carries an image")
}

fn decoded_instruction(request: &ChatRequest) -> String {
    let url = image_url(request);
    let data = url.split_once("base64,").expect("data uri").1;
    String::from_utf8(STANDARD.decode(data).expect("valid base64")).expect("utf8 instruction")
}

fn answer(content: &str) -> ChatResponse {
    ChatResponse {
        choices: vec![Choice {
            message: ResponseMessage {
                content: Some(content.to_string()),
                refusal: None,
            },
            finish_reason: Some("stop".into()),
        }],
        ..Default::default()
    }
}

fn extraction(company: &str, cost: &str) -> ChatResponse {
    answer(&format!(
        r#"{{"company_name":"{company}","cost":{cost},"date":"14-10-2026","category":"Mobile"}}"#
    ))
}

#[async_trait]
impl ClassificationClient for ScriptedClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ClassifyError> {
        self.requests.lock().unwrap().push(request.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let instruction = decoded_instruction(request);
        let parts: Vec<&str> = instruction.split(':').collect();
        let response = match parts.as_slice() {
            ["ok", company, cost] => Ok(extraction(company, cost)),
            ["delay", ms, company] => {
                tokio::time::sleep(Duration::from_millis(ms.parse().unwrap())).await;
                Ok(extraction(company, "100"))
            }
            ["status", code] => Err(ClassifyError::Status {
                status: code.parse().unwrap(),
                body: "scripted".into(),
            }),
            ["garbage"] => Ok(answer("I could not read this receipt.")),
            ["hang"] => std::future::pending().await,
            ["panic"] => panic!("scripted panic"),
            other => panic!("unknown instruction {other:?}"),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        response
    }
}

/// Writes the source file's contents to the raster output.
#[derive(Default)]
struct CopyRasterizer {
    requests: Mutex<Vec<RasterRequest>>,
    fail: bool,
}

#[async_trait]
impl Rasterizer for CopyRasterizer {
    async fn rasterize(&self, request: &RasterRequest) -> Result<(), EncodeError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(EncodeError::ConversionFailed("convert: no images defined".into()));
        }
        let bytes = std::fs::read(&request.source).unwrap();
        std::fs::write(&request.output, bytes).unwrap();
        Ok(())
    }
}

#[derive(Default)]
struct CountingObserver {
    spawned: AtomicUsize,
    encodes: AtomicUsize,
    extracts: AtomicUsize,
    outcomes: Mutex<Vec<Result<usize, ErrorKind>>>,
}

impl BatchObserver for CountingObserver {
    fn record_spawned(&self, _task_id: TaskId) {
        self.spawned.fetch_add(1, Ordering::SeqCst);
    }

    fn record_encode(&self, _latency: Duration, _result: Result<(), EncodeError>) {
        self.encodes.fetch_add(1, Ordering::SeqCst);
    }

    fn record_extract(&self, _latency: Duration, _result: Result<(), ClassifyError>) {
        self.extracts.fetch_add(1, Ordering::SeqCst);
    }

    fn record_outcome(&self, _latency: Duration, result: Result<usize, ErrorKind>) {
        self.outcomes.lock().unwrap().push(result);
    }
}

struct Harness {
    dir: tempfile::TempDir,
    client: Arc<ScriptedClient>,
    rasterizer: Arc<CopyRasterizer>,
}

impl Harness {
    fn new() -> Self {
        Self::with_rasterizer(CopyRasterizer::default())
    }

    fn with_rasterizer(rasterizer: CopyRasterizer) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            client: Arc::new(ScriptedClient::default()),
            rasterizer: Arc::new(rasterizer),
        }
    }

    fn task(&self, id: u32, name: &str, media_type: &str, body: &str) -> FileTask {
        let path = self.dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        FileTask::new(TaskId(id), name, MediaType::new(media_type), path)
    }

    fn image(&self, id: u32, body: &str) -> FileTask {
        self.task(id, &format!("receipt-{id}.jpg"), "image/jpeg", body)
    }

    fn coordinator(&self) -> BatchCoordinator {
        let encoder = Encoder::new(self.rasterizer.clone(), RasterConfig::default());
        let extractor = Extractor::new(self.client.clone(), "gpt-4o", 300);
        BatchCoordinator::new(encoder, extractor, self.dir.path())
    }

    fn requests(&self) -> usize {
        self.client.requests.lock().unwrap().len()
    }
}

#[tokio::test]
async fn empty_batch_succeeds_without_spawning() {
    let harness = Harness::new();
    let observer = Arc::new(CountingObserver::default());

    let outcome = harness
        .coordinator()
        .with_observer(observer.clone())
        .submit(Vec::new())
        .await;

    match outcome {
        BatchOutcome::Success(aggregate) => assert!(aggregate.is_empty()),
        BatchOutcome::Failure(err) => panic!("unexpected failure: {err}"),
    }
    assert_eq!(observer.spawned.load(Ordering::SeqCst), 0);
    assert_eq!(harness.requests(), 0);
    assert_eq!(*observer.outcomes.lock().unwrap(), vec![Ok(0)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn all_pipelines_succeed_in_any_order() {
    let harness = Harness::new();
    let tasks: Vec<_> = (0..5)
        .map(|i| harness.image(i, &format!("delay:{}:shop-{i}", (5 - i) * 20)))
        .collect();
    let observer = Arc::new(CountingObserver::default());

    let aggregate = harness
        .coordinator()
        .with_observer(observer.clone())
        .submit(tasks)
        .await
        .into_result()
        .expect("batch succeeds");

    assert_eq!(aggregate.len(), 5);
    let companies: HashSet<_> = aggregate.iter().map(|r| r.company_name.clone()).collect();
    let expected: HashSet<_> = (0..5).map(|i| format!("shop-{i}")).collect();
    assert_eq!(companies, expected);
    for result in &aggregate {
        assert!(result.source_path.starts_with(harness.dir.path()));
    }
    assert_eq!(observer.spawned.load(Ordering::SeqCst), 5);
    assert_eq!(observer.encodes.load(Ordering::SeqCst), 5);
    assert_eq!(observer.extracts.load(Ordering::SeqCst), 5);
    assert_eq!(*observer.outcomes.lock().unwrap(), vec![Ok(5)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_failure_fails_the_batch() {
    let harness = Harness::new();
    let tasks = vec![
        harness.image(0, "ok:ICA:120"),
        harness.image(1, "status:500"),
        harness.image(2, "ok:Telia:399"),
    ];

    let outcome = harness.coordinator().submit(tasks).await;
    let BatchOutcome::Failure(err) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(err.kind, ErrorKind::ClassificationFailed);
    assert_eq!(err.task_id, Some(TaskId(1)));
    assert_eq!(err.display_name.as_deref(), Some("receipt-1.jpg"));
    assert!(err.message.contains("HTTP 500"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn first_failure_wins_without_waiting_for_stuck_siblings() {
    let harness = Harness::new();
    let tasks = vec![
        harness.image(0, "hang"),
        harness.image(1, "status:503"),
        harness.image(2, "garbage"),
        harness.image(3, "ok:SL:970"),
    ];

    let outcome = tokio::time::timeout(Duration::from_secs(10), harness.coordinator().submit(tasks))
        .await
        .expect("a hanging pipeline must not block the batch");

    let BatchOutcome::Failure(err) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(err.kind, ErrorKind::ClassificationFailed);
    assert!(
        matches!(err.task_id, Some(TaskId(1)) | Some(TaskId(2))),
        "reported {:?}",
        err.task_id
    );
}

#[tokio::test]
async fn jpeg_is_sent_unchanged_once() {
    let harness = Harness::new();
    let body = "ok:Pressbyran:45";
    let tasks = vec![harness.image(0, body)];

    let aggregate = harness
        .coordinator()
        .submit(tasks)
        .await
        .into_result()
        .expect("batch succeeds");

    assert_eq!(aggregate.len(), 1);
    assert_eq!(aggregate.as_slice()[0].cost, 45);
    let requests = harness.client.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        image_url(&requests[0]),
        format!("data:image/jpeg;base64,{}", STANDARD.encode(body))
    );
    assert!(harness.rasterizer.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pdf_is_rasterized_and_sent_as_jpeg() {
    let harness = Harness::new();
    let tasks = vec![harness.task(7, "invoice.pdf", "application/pdf", "ok:Elgiganten:2345")];

    let aggregate = harness
        .coordinator()
        .submit(tasks)
        .await
        .into_result()
        .expect("batch succeeds");

    let result = &aggregate.as_slice()[0];
    assert_eq!(result.company_name, "Elgiganten");
    assert_eq!(result.source_path, harness.dir.path().join("invoice.pdf"));

    let raster_requests = harness.rasterizer.requests.lock().unwrap();
    assert_eq!(raster_requests.len(), 1);
    assert_eq!(raster_requests[0].page, 0);
    assert_eq!(raster_requests[0].output, harness.dir.path().join("task-0007.jpg"));

    let requests = harness.client.requests.lock().unwrap();
    assert!(image_url(&requests[0]).starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn rasterizer_failure_is_conversion_failure() {
    let harness = Harness::with_rasterizer(CopyRasterizer {
        fail: true,
        ..Default::default()
    });
    let tasks = vec![
        harness.task(0, "broken.pdf", "application/pdf", "%PDF"),
        harness.image(1, "ok:ICA:10"),
    ];

    let err = harness
        .coordinator()
        .submit(tasks)
        .await
        .into_result()
        .expect_err("batch fails");
    assert_eq!(err.kind, ErrorKind::ConversionFailed);
    assert_eq!(err.task_id, Some(TaskId(0)));
}

#[tokio::test]
async fn unreadable_upload_is_persistence_failure() {
    let harness = Harness::new();
    let missing = FileTask::new(
        TaskId(0),
        "vanished.png",
        MediaType::new("image/png"),
        harness.dir.path().join("vanished.png"),
    );

    let err = harness
        .coordinator()
        .submit(vec![missing])
        .await
        .into_result()
        .expect_err("batch fails");
    assert_eq!(err.kind, ErrorKind::PersistenceFailed);
    assert_eq!(harness.requests(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_pipeline_is_internal_failure() {
    let harness = Harness::new();
    let tasks = vec![harness.image(0, "ok:ICA:10"), harness.image(1, "panic")];

    let err = harness
        .coordinator()
        .submit(tasks)
        .await
        .into_result()
        .expect_err("batch fails");
    assert_eq!(err.kind, ErrorKind::Internal);
    assert_eq!(err.task_id, Some(TaskId(1)));
    assert!(err.message.contains("scripted panic"), "message: {}", err.message);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panic_fails_the_batch_without_waiting_for_stuck_siblings() {
    let harness = Harness::new();
    let tasks = vec![harness.image(0, "hang"), harness.image(1, "panic")];

    let outcome = tokio::time::timeout(Duration::from_secs(5), harness.coordinator().submit(tasks))
        .await
        .expect("a panicking pipeline must resolve the batch");

    let BatchOutcome::Failure(err) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(err.kind, ErrorKind::Internal);
    assert_eq!(err.task_id, Some(TaskId(1)));
    assert_eq!(err.display_name.as_deref(), Some("receipt-1.jpg"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrency_cap_limits_in_flight_pipelines() {
    let harness = Harness::new();
    let tasks: Vec<_> = (0..6).map(|i| harness.image(i, &format!("delay:15:c{i}"))).collect();

    let aggregate = harness
        .coordinator()
        .with_config(BatchConfig {
            max_concurrency: Some(2),
        })
        .submit(tasks)
        .await
        .into_result()
        .expect("batch succeeds");

    assert_eq!(aggregate.len(), 6);
    assert!(harness.client.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn tasks_are_consumed_and_files_left_for_export() {
    let harness = Harness::new();
    let task = harness.image(0, "ok:ICA:10");
    let location = task.location().to_path_buf();

    harness
        .coordinator()
        .submit(vec![task])
        .await
        .into_result()
        .expect("batch succeeds");

    assert!(Path::new(&location).exists());
}
