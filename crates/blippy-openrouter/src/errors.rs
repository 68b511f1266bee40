//! Error types for the OpenRouter client.

use thiserror::Error;

/// Errors returned by OpenRouter requests.
#[derive(Debug, Error)]
pub enum OpenRouterError {
    /// Transport-level failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-200 response from the API.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Response body could not be decoded.
    #[error("decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The stream reader failed mid-stream.
    #[error("stream error: {0}")]
    Stream(String),

    /// A completion arrived with no usable output.
    #[error("no output in response")]
    EmptyResponse,
}

/// Convenience alias for client results.
pub type Result<T> = std::result::Result<T, OpenRouterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let err = OpenRouterError::Status { status: 429, body: "rate limited".into() };
        assert_eq!(err.to_string(), "unexpected status 429: rate limited");
    }

    #[test]
    fn stream_error_display() {
        let err = OpenRouterError::Stream("connection reset".into());
        assert!(err.to_string().contains("connection reset"));
    }
}
