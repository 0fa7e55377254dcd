//! Error types for the completion client.

use thiserror::Error;

/// Result type for completion client operations.
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Completion client errors.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl CompletionError {
    /// Whether retrying the request could plausibly succeed.
    ///
    /// Network failures, server errors, rate limits, and malformed
    /// responses are transient. Client-side validation errors (4xx other
    /// than 429) are not.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Network(_) | CompletionError::Parse(_) => true,
            CompletionError::Api { status, .. } => *status == 429 || *status >= 500,
            CompletionError::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CompletionError::Network("refused".into()).is_transient());
        assert!(CompletionError::Parse("bad json".into()).is_transient());
        assert!(CompletionError::Api {
            status: 429,
            message: "rate limited".into()
        }
        .is_transient());
        assert!(CompletionError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());

        assert!(!CompletionError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!CompletionError::Config("no key".into()).is_transient());
    }
}
