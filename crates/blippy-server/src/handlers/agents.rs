//! Agent CRUD handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use blippy_store::repositories::{AgentRepo, CreateAgentParams};
use blippy_store::rows::AgentRow;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Per-root tool grant, as stored in the agent's config JSON.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FsRootConfigBody {
    pub root_id: String,
    #[serde(default)]
    pub enabled_tools: Vec<String>,
}

/// Request body for creating or updating an agent.
#[derive(Debug, Default, Deserialize)]
pub struct AgentBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub enabled_tools: Vec<String>,
    #[serde(default)]
    pub enabled_notification_channels: Vec<String>,
    #[serde(default)]
    pub enabled_filesystem_roots: Vec<FsRootConfigBody>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub forwarded_host_env_vars: Vec<String>,
}

/// An agent as returned by the API, with JSON columns expanded.
#[derive(Debug, Serialize)]
pub struct AgentView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub enabled_tools: Vec<String>,
    pub enabled_notification_channels: Vec<String>,
    pub enabled_filesystem_roots: Vec<FsRootConfigBody>,
    pub model: String,
    pub forwarded_host_env_vars: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AgentRow> for AgentView {
    fn from(row: AgentRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            system_prompt: row.system_prompt,
            enabled_tools: serde_json::from_str(&row.enabled_tools_json).unwrap_or_default(),
            enabled_notification_channels: serde_json::from_str(
                &row.enabled_notification_channels_json,
            )
            .unwrap_or_default(),
            enabled_filesystem_roots: serde_json::from_str(&row.enabled_filesystem_roots_json)
                .unwrap_or_default(),
            model: row.model,
            forwarded_host_env_vars: serde_json::from_str(&row.forwarded_host_env_vars_json)
                .unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn to_params(body: &AgentBody) -> ApiResult<CreateAgentParams> {
    if body.name.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    Ok(CreateAgentParams {
        name: body.name.clone(),
        description: body.description.clone(),
        system_prompt: body.system_prompt.clone(),
        enabled_tools_json: serde_json::to_string(&body.enabled_tools).unwrap_or_default(),
        enabled_notification_channels_json: serde_json::to_string(
            &body.enabled_notification_channels,
        )
        .unwrap_or_default(),
        enabled_filesystem_roots_json: serde_json::to_string(&body.enabled_filesystem_roots)
            .unwrap_or_default(),
        model: body.model.clone(),
        forwarded_host_env_vars_json: serde_json::to_string(&body.forwarded_host_env_vars)
            .unwrap_or_default(),
    })
}

/// `POST /api/agents`
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<AgentBody>,
) -> ApiResult<Json<AgentView>> {
    let params = to_params(&body)?;
    let conn = state.store.conn().map_err(ApiError::from)?;
    let row = AgentRepo::create(&conn, &params)?;
    Ok(Json(row.into()))
}

/// `GET /api/agents`
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<AgentView>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let rows = AgentRepo::list(&conn)?;
    Ok(Json(rows.into_iter().map(AgentView::from).collect()))
}

/// `GET /api/agents/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AgentView>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let row = AgentRepo::get(&conn, &id)?;
    Ok(Json(row.into()))
}

/// `PUT /api/agents/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AgentBody>,
) -> ApiResult<Json<AgentView>> {
    let params = to_params(&body)?;
    let conn = state.store.conn().map_err(ApiError::from)?;
    let row = AgentRepo::update(&conn, &id, &params)?;
    Ok(Json(row.into()))
}

/// `DELETE /api/agents/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    AgentRepo::delete(&conn, &id)?;
    Ok(Json(serde_json::json!({})))
}
