//! Shared state for Axum handlers.

use std::sync::Arc;

use blippy_openrouter::OpenRouterClient;
use blippy_runtime::{AgentLoop, Broker, Runner};
use blippy_store::Store;

/// Everything the HTTP surface needs, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub broker: Broker,
    pub agent_loop: Arc<AgentLoop>,
    pub runner: Arc<Runner>,
    pub client: Arc<OpenRouterClient>,
}
