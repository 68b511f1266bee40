//! Model listing handler.

use axum::extract::State;
use axum::Json;

use blippy_openrouter::Model;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// `GET /api/models`
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Model>>> {
    let models = state.client.list_models().await.map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(models))
}
