//! # blippy-server
//!
//! The HTTP surface: the webhook trigger endpoint, the JSON CRUD API for
//! agents/conversations/triggers/channels/roots, SSE chat and event
//! subscription, and the models listing.

#![deny(unsafe_code)]

pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use server::{listen, router};
pub use state::AppState;
