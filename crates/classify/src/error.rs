use thiserror::Error;

/// Errors surfaced while classifying a receipt.
///
/// All variants are terminal for the receipt's pipeline; the batch layer
/// reports each of them as a classification failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ClassifyError {
    /// The request never produced an HTTP response (DNS, connect, TLS, timeout).
    #[error("classification request failed: {0}")]
    Transport(String),

    /// The service answered with anything other than 200 OK.
    #[error("classification service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// A 200 response whose body or message content was not the expected JSON.
    #[error("malformed classification response: {0}")]
    MalformedResponse(String),

    #[error("invalid classify config: {0}")]
    InvalidConfig(String),
}

impl ClassifyError {
    /// Transient failures worth another attempt: transport errors, 429 and 5xx.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClassifyError::Transport(_) => true,
            ClassifyError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// HTTP status reported by the service, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClassifyError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display_carries_body() {
        let err = ClassifyError::Status {
            status: 401,
            body: "invalid api key".into(),
        };
        assert_eq!(
            err.to_string(),
            "classification service returned HTTP 401: invalid api key"
        );
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn retryable_classification() {
        assert!(ClassifyError::Transport("reset".into()).is_retryable());
        assert!(ClassifyError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(ClassifyError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(!ClassifyError::Status { status: 400, body: String::new() }.is_retryable());
        assert!(!ClassifyError::MalformedResponse("x".into()).is_retryable());
    }
}
