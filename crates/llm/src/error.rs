//! Adapter-boundary error type. Every variant is handled by a documented
//! fallback in the engine crate (§7) — nothing here is fatal to a meeting.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("backend returned an error: {0}")]
    Api(String),

    #[error("response failed schema validation: {0}")]
    SchemaValidation(String),

    #[error("response body could not be parsed: {0}")]
    InvalidResponse(String),
}

impl LlmError {
    /// Transient failures worth a single retry (§7: "Retry once with jitter").
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
