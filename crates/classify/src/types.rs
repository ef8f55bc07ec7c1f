use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::{normalize_date, parse_cost};

/// Expense category of a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    SlCard,
    Mobile,
    Fitness,
    /// Anything outside the known set. Serializes as the empty string.
    #[default]
    Unrecognized,
}

impl Category {
    pub const KNOWN: [Category; 3] = [Category::SlCard, Category::Mobile, Category::Fitness];

    pub fn label(&self) -> &'static str {
        match self {
            Category::SlCard => "SL Card",
            Category::Mobile => "Mobile",
            Category::Fitness => "Fitness",
            Category::Unrecognized => "",
        }
    }

    /// Case and whitespace insensitive lookup.
    pub fn from_label(raw: &str) -> Self {
        let wanted = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::KNOWN
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(&wanted))
            .unwrap_or(Category::Unrecognized)
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        Category::from_label(&raw)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.label().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured fields read from one receipt.
///
/// Every field always has a value: unknown strings are empty, unknown cost is
/// 0. Deserialization is lenient (see [`ExtractionResult::from_model_json`]).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawExtraction")]
pub struct ExtractionResult {
    pub company_name: String,
    /// `DD-MM-YYYY`, or empty.
    pub date: String,
    /// Whole currency units.
    pub cost: i64,
    pub raw_cost_text: String,
    pub category: Category,
    /// Persisted upload this result was read from.
    pub source_path: PathBuf,
}

impl ExtractionResult {
    /// Parses the JSON object a model returned for the receipt at `source_path`.
    ///
    /// Missing and `null` fields take their defaults. `cost` may be an
    /// integer, a float (truncated) or a printed amount; `date` may use any
    /// common day/month/year layout and is rewritten to `DD-MM-YYYY`.
    ///
    /// ```rust
    /// use classify::{Category, ExtractionResult};
    ///
    /// let r = ExtractionResult::from_model_json(
    ///     r#"{"company_name":"ICA","cost":"1 234,50 kr","date":"2024-03-05","category":"mobile"}"#,
    ///     "/tmp/a.jpg",
    /// ).unwrap();
    /// assert_eq!(r.cost, 1234);
    /// assert_eq!(r.date, "05-03-2024");
    /// assert_eq!(r.category, Category::Mobile);
    /// assert_eq!(r.raw_cost_text, "");
    /// ```
    pub fn from_model_json(content: &str, source_path: impl Into<PathBuf>) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(content)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("expected a JSON object"));
        }
        let raw: RawExtraction = serde_json::from_value(value)?;
        let mut result = ExtractionResult::from(raw);
        result.source_path = source_path.into();
        Ok(result)
    }
}

/// Wire form accepted for [`ExtractionResult`]; any JSON type per field.
#[derive(Deserialize)]
struct RawExtraction {
    #[serde(default)]
    company_name: Value,
    #[serde(default)]
    date: Value,
    #[serde(default)]
    cost: Value,
    #[serde(default)]
    raw_cost_text: Value,
    #[serde(default)]
    category: Value,
    #[serde(default)]
    source_path: Option<PathBuf>,
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn cost_of(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => parse_cost(s),
        _ => 0,
    }
}

impl From<RawExtraction> for ExtractionResult {
    fn from(raw: RawExtraction) -> Self {
        Self {
            company_name: text_of(&raw.company_name),
            date: normalize_date(&text_of(&raw.date)),
            cost: cost_of(&raw.cost),
            raw_cost_text: text_of(&raw.raw_cost_text),
            category: match &raw.category {
                Value::String(s) => Category::from_label(s),
                _ => Category::Unrecognized,
            },
            source_path: raw.source_path.unwrap_or_default(),
        }
    }
}

/// Chat-completion request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub response_format: ResponseFormat,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            kind: "json_object".to_string(),
        }
    }
}

/// The parts of a chat-completion response the extractor reads.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub refusal: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
