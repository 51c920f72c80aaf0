//! Gateway error types.

use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The model answered but the payload held nothing usable.
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// The video operation finished without a video URI.
    #[error("No video output returned by the model")]
    NoOutput,

    #[error("Video download failed: {0}")]
    DownloadFailed(String),

    #[error("Video operation failed: {0}")]
    OperationFailed(String),

    #[error("Request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Polling gave up after {attempts} attempts")]
    PollTimeout { attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn empty_result(msg: impl Into<String>) -> Self {
        Self::EmptyResult(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn operation_failed(msg: impl Into<String>) -> Self {
        Self::OperationFailed(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if error is retryable at the transport level.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Network(_) => true,
            GatewayError::RequestFailed { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let throttled = GatewayError::RequestFailed {
            status: 429,
            body: String::new(),
        };
        let unavailable = GatewayError::RequestFailed {
            status: 503,
            body: String::new(),
        };
        let bad_request = GatewayError::RequestFailed {
            status: 400,
            body: String::new(),
        };

        assert!(throttled.is_retryable());
        assert!(unavailable.is_retryable());
        assert!(!bad_request.is_retryable());
        assert!(!GatewayError::NoOutput.is_retryable());
    }
}
