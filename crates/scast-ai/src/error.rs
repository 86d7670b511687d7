//! AI client error types.

use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("API key not configured: {0}")]
    MissingApiKey(String),

    #[error("Provider unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Empty response from provider")]
    EmptyResponse,

    #[error("Scene breakdown unparsable: {0}")]
    MalformedPlan(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AiError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AiError::ServiceUnavailable(_) | AiError::Network(_)
        )
    }
}
