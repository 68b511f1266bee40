//! # blippy-openrouter
//!
//! HTTP client for the OpenRouter Responses API: non-streaming and SSE
//! streaming completions, a models listing with a 1-hour cache, and the
//! short-completion title helper.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod sse;
pub mod types;

pub use client::OpenRouterClient;
pub use errors::{OpenRouterError, Result};
pub use types::{
    ContentPart, Input, Model, OutputItem, Response, ResponseError, ResponseRequest, StreamEvent,
};
