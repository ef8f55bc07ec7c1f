//! Batches that reach a mocked chat-completions endpoint over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use kvitto::{
    BatchCoordinator, ClassifyConfig, EncodeError, Encoder, ErrorKind, Extractor, FileTask,
    MediaType, RasterConfig, RasterRequest, Rasterizer, TaskId,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct NoRaster;

#[async_trait]
impl Rasterizer for NoRaster {
    async fn rasterize(&self, _request: &RasterRequest) -> Result<(), EncodeError> {
        Err(EncodeError::ConversionFailed("unexpected rasterize".into()))
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "model": "gpt-4o",
        "choices": [{
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 900, "completion_tokens": 40, "total_tokens": 940 }
    })
}

fn coordinator(server: &MockServer, scratch: &std::path::Path) -> BatchCoordinator {
    let config = ClassifyConfig {
        api_url: format!("{}/v1/chat/completions", server.uri()),
        api_key: Some("sk-test".into()),
        ..Default::default()
    };
    let extractor = Extractor::from_config(&config).expect("valid config");
    let encoder = Encoder::new(Arc::new(NoRaster), RasterConfig::default());
    BatchCoordinator::new(encoder, extractor, scratch)
}

fn image_task(dir: &std::path::Path, id: u32, body: &[u8]) -> FileTask {
    let name = format!("kvitto-{id}.jpg");
    let location = dir.join(&name);
    std::fs::write(&location, body).unwrap();
    FileTask::new(TaskId(id), name, MediaType::jpeg(), location)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_200_on_one_request_fails_the_batch() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let failing_body = b"second receipt";

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(STANDARD.encode(failing_body)))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"company_name":"ICA","cost":"120,50","date":"2026-10-01","category":"Other"}"#,
        )))
        .with_priority(5)
        .mount(&server)
        .await;

    let tasks = vec![
        image_task(dir.path(), 0, b"first receipt"),
        image_task(dir.path(), 1, failing_body),
        image_task(dir.path(), 2, b"third receipt"),
    ];

    let err = coordinator(&server, dir.path())
        .submit(tasks)
        .await
        .into_result()
        .expect_err("batch fails");

    assert_eq!(err.kind, ErrorKind::ClassificationFailed);
    assert_eq!(err.task_id, Some(TaskId(1)));
    assert!(err.message.contains("500"), "message: {}", err.message);
}

#[tokio::test]
async fn non_json_content_fails_the_batch() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("Sorry, I can only see a blurry photo.")),
        )
        .mount(&server)
        .await;

    let err = coordinator(&server, dir.path())
        .submit(vec![image_task(dir.path(), 0, b"blurry")])
        .await
        .into_result()
        .expect_err("batch fails");

    assert_eq!(err.kind, ErrorKind::ClassificationFailed);
    assert_eq!(err.display_name.as_deref(), Some("kvitto-0.jpg"));
}

#[tokio::test]
async fn successful_batch_normalizes_fields() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"company_name":"Telia","cost":"1 299,00 kr","date":"2026-10-02","category":"mobile"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let aggregate = coordinator(&server, dir.path())
        .submit(vec![image_task(dir.path(), 0, b"telia")])
        .await
        .into_result()
        .expect("batch succeeds");

    let result = &aggregate.as_slice()[0];
    assert_eq!(result.company_name, "Telia");
    assert_eq!(result.date, "02-10-2026");
    assert_eq!(result.cost, 1299);
    assert_eq!(result.category, kvitto::Category::Mobile);
}
