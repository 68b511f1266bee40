//! Webhook trigger endpoint.
//!
//! A single POST endpoint that validates a `{agent_id, prompt}` payload and
//! runs the agent synchronously. The method-not-allowed case is handled by
//! Axum's method routing (405 for non-POST on the matched path).

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use blippy_runtime::RunOptions;
use blippy_store::repositories::AgentRepo;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub conversation_id: String,
    pub response: String,
}

/// `POST /webhooks/trigger`
pub async fn trigger(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<Json<TriggerResponse>> {
    // Manual parse: malformed JSON is a 400 with a stable message.
    let req: TriggerRequest = serde_json::from_str(&body)
        .map_err(|_| ApiError::BadRequest("invalid JSON".into()))?;

    if req.agent_id.is_empty() {
        return Err(ApiError::BadRequest("agent_id is required".into()));
    }
    if req.prompt.is_empty() {
        return Err(ApiError::BadRequest("prompt is required".into()));
    }

    {
        let conn = state.store.conn().map_err(ApiError::from)?;
        if let Err(e) = AgentRepo::get(&conn, &req.agent_id) {
            warn!(agent_id = %req.agent_id, error = %e, "webhook trigger for unknown agent");
            return Err(ApiError::NotFound("agent not found".into()));
        }
    }

    let result = state
        .runner
        .run(
            CancellationToken::new(),
            RunOptions {
                agent_id: req.agent_id.clone(),
                prompt: req.prompt,
                depth: 0,
                model: String::new(),
                title: String::new(),
            },
        )
        .await
        .map_err(|e| ApiError::Internal(format!("agent run failed: {e}")))?;

    info!(
        agent_id = %req.agent_id,
        conversation_id = %result.conversation_id,
        "webhook trigger completed"
    );

    Ok(Json(TriggerResponse {
        conversation_id: result.conversation_id,
        response: result.response,
    }))
}
