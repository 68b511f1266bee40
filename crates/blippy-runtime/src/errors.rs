//! Error types for the runtime.

use thiserror::Error;

/// Errors produced by the agent loop, runner, and scheduler.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Agent-to-agent recursion exceeded the bound.
    #[error("max depth exceeded: {depth} > {max}")]
    MaxDepthExceeded {
        /// Requested depth.
        depth: u32,
        /// Configured bound.
        max: u32,
    },

    /// The conversation already has an in-flight turn.
    #[error("conversation busy: {0}")]
    Busy(String),

    /// The LLM stream failed.
    #[error("stream error: {0}")]
    Stream(#[from] blippy_openrouter::OpenRouterError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] blippy_store::StoreError),

    /// Tool resolution or execution infrastructure failure.
    #[error("process output: {0}")]
    Tool(#[from] blippy_tools::ToolError),

    /// Items could not be serialized for persistence.
    #[error("marshal items: {0}")]
    Serde(#[from] serde_json::Error),

    /// The turn's context was cancelled.
    #[error("turn cancelled")]
    Cancelled,

    /// Cron expression could not be parsed.
    #[error("invalid cron expression: {0}")]
    InvalidCron(String),
}

impl RuntimeError {
    /// Whether this error is a missing-row error from the store.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }
}

/// Convenience alias for runtime results.
pub type Result<T> = std::result::Result<T, RuntimeError>;
