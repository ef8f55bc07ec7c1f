use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use crate::retry::retry_async;
use crate::{ChatRequest, ChatResponse, ClassifyConfig, ClassifyError};

/// Remote service that answers chat-completion requests.
#[async_trait]
pub trait ClassificationClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ClassifyError>;
}

/// [`ClassificationClient`] for OpenAI-compatible HTTP endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    config: ClassifyConfig,
}

impl OpenAiClient {
    pub fn new(config: ClassifyConfig) -> Result<Self, ClassifyError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(32);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ClassifyError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClassifyConfig {
        &self.config
    }

    async fn send_once(&self, request: &ChatRequest) -> Result<ChatResponse, ClassifyError> {
        let mut builder = self.http.post(&self.config.api_url).json(request);
        if let Some(key) = self.config.api_key.as_deref() {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let status = response.status();
        // Only a plain 200 carries a completion.
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| ClassifyError::MalformedResponse(format!("response body: {e}")))?;

        if let Some(usage) = parsed.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "classification_usage"
            );
        }
        Ok(parsed)
    }
}

#[async_trait]
impl ClassificationClient for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ClassifyError> {
        retry_async(&self.config.retry, ClassifyError::is_retryable, |_| {
            self.send_once(request)
        })
        .await
        .into_result()
    }
}
