//! Conversation CRUD and message listing handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use blippy_store::repositories::{AgentRepo, ConversationRepo, MessageRepo};
use blippy_store::rows::{ConversationRow, MessageRow};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateConversationBody {
    #[serde(default)]
    pub agent_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub agent_id: String,
}

/// A message as returned by the API, items expanded.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub items: serde_json::Value,
    pub created_at: String,
}

impl From<MessageRow> for MessageView {
    fn from(row: MessageRow) -> Self {
        let items =
            serde_json::from_str(&row.items_json).unwrap_or(serde_json::Value::Array(Vec::new()));
        Self {
            id: row.id,
            conversation_id: row.conversation_id,
            role: row.role,
            items,
            created_at: row.created_at,
        }
    }
}

/// `POST /api/conversations`
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateConversationBody>,
) -> ApiResult<Json<ConversationRow>> {
    if body.agent_id.is_empty() {
        return Err(ApiError::BadRequest("agent_id is required".into()));
    }
    let conn = state.store.conn().map_err(ApiError::from)?;
    // Surface a 404 (not a foreign-key 500) for unknown agents.
    let _ = AgentRepo::get(&conn, &body.agent_id)?;
    let row = ConversationRepo::create(&conn, &body.agent_id, "")?;
    Ok(Json(row))
}

/// `GET /api/conversations`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ConversationRow>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let rows = if query.agent_id.is_empty() {
        ConversationRepo::list_all(&conn)?
    } else {
        ConversationRepo::list_by_agent(&conn, &query.agent_id)?
    };
    Ok(Json(rows))
}

/// `GET /api/conversations/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConversationRow>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    Ok(Json(ConversationRepo::get(&conn, &id)?))
}

/// `DELETE /api/conversations/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    ConversationRepo::delete(&conn, &id)?;
    Ok(Json(serde_json::json!({})))
}

/// `GET /api/conversations/{id}/messages`
pub async fn messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<MessageView>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let _ = ConversationRepo::get(&conn, &id)?;
    let rows = MessageRepo::list_by_conversation(&conn, &id)?;
    Ok(Json(rows.into_iter().map(MessageView::from).collect()))
}
