//! Receipt field extraction.
//!
//! [`Extractor`] turns an [`encode::EncodedPayload`] into an
//! [`ExtractionResult`] by sending one chat-completion request with the image
//! inlined as a data URI and parsing the model's JSON answer. The transport
//! sits behind the [`ClassificationClient`] trait; [`OpenAiClient`] is the
//! reqwest implementation.
//!
//! Error mapping:
//!
//! | Situation | Error |
//! |-----------|-------|
//! | connect/TLS/timeout | [`ClassifyError::Transport`] |
//! | any status other than 200 | [`ClassifyError::Status`] |
//! | no choices, null content, non-JSON content | [`ClassifyError::MalformedResponse`] |

mod client;
mod config;
mod error;
mod extractor;
pub mod normalize;
mod prompt;
pub mod retry;
mod types;

pub use client::{ClassificationClient, OpenAiClient};
pub use config::{ClassifyConfig, DEFAULT_API_URL};
pub use error::ClassifyError;
pub use extractor::Extractor;
pub use prompt::instruction;
pub use retry::RetryConfig;
pub use types::{
    Category, ChatMessage, ChatRequest, ChatResponse, Choice, ContentPart, ExtractionResult,
    ImageUrl, ResponseFormat, ResponseMessage, Usage,
};
