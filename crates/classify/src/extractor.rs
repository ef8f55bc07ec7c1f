use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use encode::EncodedPayload;
use tracing::{debug, warn};

use crate::{
    prompt, ChatMessage, ChatRequest, ClassificationClient, ClassifyConfig, ClassifyError,
    ContentPart, ExtractionResult, ImageUrl, OpenAiClient, ResponseFormat,
};

/// Reads receipt fields from an encoded image through a [`ClassificationClient`].
///
/// Makes exactly one `complete` call per receipt; retrying, if any, is the
/// client's business.
#[derive(Clone)]
pub struct Extractor {
    client: Arc<dyn ClassificationClient>,
    model: String,
    max_tokens: u32,
}

impl Extractor {
    pub fn new(client: Arc<dyn ClassificationClient>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client,
            model: model.into(),
            max_tokens,
        }
    }

    /// Extractor talking to the endpoint described by `config`.
    pub fn from_config(config: &ClassifyConfig) -> Result<Self, ClassifyError> {
        let client = OpenAiClient::new(config.clone())?;
        Ok(Self::new(Arc::new(client), config.model.clone(), config.max_tokens))
    }

    pub fn build_request(&self, payload: &EncodedPayload) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt::instruction(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: payload.data_uri(),
                        },
                    },
                ],
            }],
            response_format: ResponseFormat::json_object(),
            max_tokens: self.max_tokens,
        }
    }

    pub async fn extract(
        &self,
        payload: &EncodedPayload,
        source_path: &Path,
    ) -> Result<ExtractionResult, ClassifyError> {
        let start = Instant::now();
        let result = self.extract_inner(payload, source_path).await;
        let elapsed_micros = start.elapsed().as_micros() as u64;

        match &result {
            Ok(r) => debug!(
                source = %source_path.display(),
                company = %r.company_name,
                cost = r.cost,
                category = %r.category,
                elapsed_micros,
                "extract_success"
            ),
            Err(err) => warn!(
                source = %source_path.display(),
                error = %err,
                elapsed_micros,
                "extract_failure"
            ),
        }
        result
    }

    async fn extract_inner(
        &self,
        payload: &EncodedPayload,
        source_path: &Path,
    ) -> Result<ExtractionResult, ClassifyError> {
        let request = self.build_request(payload);
        let response = self.client.complete(&request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClassifyError::MalformedResponse("response contained no choices".into()))?;
        let content = match (choice.message.content, choice.message.refusal) {
            (Some(content), _) => content,
            (None, Some(refusal)) => {
                return Err(ClassifyError::MalformedResponse(format!("model refused: {refusal}")))
            }
            (None, None) => {
                return Err(ClassifyError::MalformedResponse("first choice had no content".into()))
            }
        };

        ExtractionResult::from_model_json(&content, source_path)
            .map_err(|e| ClassifyError::MalformedResponse(format!("message content: {e}")))
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}
