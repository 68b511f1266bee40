//! Error types for the tool system.
//!
//! Tool failures are ultimately shown to the LLM as `"Error: <message>"`
//! result text, so messages are written for the model to act on.

use thiserror::Error;

/// Errors returned by tool lookup and execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool with the given name is registered or resolvable.
    #[error("tool not found: {name}")]
    NotFound {
        /// The (decoded) tool name.
        name: String,
    },

    /// Arguments did not match the tool's schema.
    #[error("parse args: {0}")]
    InvalidArguments(String),

    /// The handler ran and failed.
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    /// Build a handler failure from any displayable cause.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidArguments(e.to_string())
    }
}

impl From<std::io::Error> for ToolError {
    fn from(e: std::io::Error) -> Self {
        Self::Failed(e.to_string())
    }
}

/// Convenience alias for tool results.
pub type Result<T> = std::result::Result<T, ToolError>;
