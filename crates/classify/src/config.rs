use std::fmt;

use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;
use crate::ClassifyError;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Settings for the classification service and the requests sent to it.
///
/// # Example
/// ```no_run
/// use classify::{ClassifyConfig, Extractor};
///
/// let cfg = ClassifyConfig {
///     api_key: std::env::var("OPENAI_API_KEY").ok(),
///     ..Default::default()
/// };
/// let extractor = Extractor::from_config(&cfg).expect("valid config");
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Chat-completions endpoint.
    pub api_url: String,
    /// Bearer token. Never serialized; usually injected from the environment.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Vision capable model id.
    pub model: String,
    /// Upper bound on response length.
    pub max_tokens: u32,
    /// Whole-request timeout in seconds. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: u64,
    /// Client-level retry. Disabled by default.
    pub retry: RetryConfig,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
            max_tokens: 300,
            timeout_secs: None,
            connect_timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

impl fmt::Debug for ClassifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifyConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ClassifyConfig {
    pub fn validate(&self) -> Result<(), ClassifyError> {
        reqwest::Url::parse(&self.api_url)
            .map_err(|e| ClassifyError::InvalidConfig(format!("api_url {:?}: {e}", self.api_url)))?;
        if self.model.trim().is_empty() {
            return Err(ClassifyError::InvalidConfig("model must not be empty".into()));
        }
        if self.max_tokens == 0 {
            return Err(ClassifyError::InvalidConfig("max_tokens must be greater than zero".into()));
        }
        if self.timeout_secs == Some(0) {
            return Err(ClassifyError::InvalidConfig("timeout_secs must be greater than zero".into()));
        }
        self.retry.validate().map_err(ClassifyError::InvalidConfig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_openai() {
        let cfg = ClassifyConfig::default();
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.max_tokens, 300);
        assert!(cfg.timeout_secs.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = ClassifyConfig {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("sk-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn invalid_url_rejected() {
        let cfg = ClassifyConfig {
            api_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ClassifyError::InvalidConfig(_))));
    }

    #[test]
    fn key_is_not_serialized() {
        let cfg = ClassifyConfig {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
