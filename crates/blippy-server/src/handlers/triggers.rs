//! Trigger CRUD and run-history handlers.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use blippy_runtime::next_cron_occurrence;
use blippy_store::repositories::{
    AgentRepo, CreateTriggerParams, TriggerRepo, TriggerRunRepo, UpdateTriggerParams,
};
use blippy_store::rows::{TriggerRow, TriggerRunRow};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateTriggerBody {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prompt: String,
    /// Cron expression for recurring triggers.
    #[serde(default)]
    pub cron_expr: String,
    /// Delay for one-shot triggers (e.g. "30m").
    #[serde(default)]
    pub delay: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub conversation_title: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTriggerBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub cron_expr: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub conversation_title: String,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub agent_id: String,
}

/// `POST /api/triggers`
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateTriggerBody>,
) -> ApiResult<Json<TriggerRow>> {
    if body.agent_id.is_empty() {
        return Err(ApiError::BadRequest("agent_id is required".into()));
    }
    if body.prompt.is_empty() {
        return Err(ApiError::BadRequest("prompt is required".into()));
    }
    if !body.cron_expr.is_empty() && !body.delay.is_empty() {
        return Err(ApiError::BadRequest("cron_expr and delay are mutually exclusive".into()));
    }
    if body.cron_expr.is_empty() && body.delay.is_empty() {
        return Err(ApiError::BadRequest("either cron_expr or delay must be specified".into()));
    }

    let (cron_expr, next_run_at) = if !body.cron_expr.is_empty() {
        let next = next_cron_occurrence(&body.cron_expr, Utc::now())
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        (Some(body.cron_expr.clone()), next)
    } else {
        let duration = humantime::parse_duration(&body.delay)
            .map_err(|e| ApiError::BadRequest(format!("invalid delay format: {e}")))?;
        if duration.is_zero() {
            return Err(ApiError::BadRequest("delay must be positive".into()));
        }
        let duration = chrono::Duration::from_std(duration)
            .map_err(|e| ApiError::BadRequest(format!("invalid delay format: {e}")))?;
        (None, Utc::now() + duration)
    };

    let name = if body.name.is_empty() { body.prompt.clone() } else { body.name.clone() };

    let conn = state.store.conn().map_err(ApiError::from)?;
    let _ = AgentRepo::get(&conn, &body.agent_id)?;
    let row = TriggerRepo::create(
        &conn,
        &CreateTriggerParams {
            agent_id: body.agent_id,
            name,
            prompt: body.prompt,
            cron_expr,
            next_run_at: Some(next_run_at.to_rfc3339()),
            model: body.model,
            conversation_title: body.conversation_title,
        },
    )?;
    Ok(Json(row))
}

/// `GET /api/triggers`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<TriggerRow>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let rows = TriggerRepo::list_all(&conn)?;
    let rows = if query.agent_id.is_empty() {
        rows
    } else {
        rows.into_iter().filter(|t| t.agent_id == query.agent_id).collect()
    };
    Ok(Json(rows))
}

/// `GET /api/triggers/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TriggerRow>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    Ok(Json(TriggerRepo::get(&conn, &id)?))
}

/// `PUT /api/triggers/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTriggerBody>,
) -> ApiResult<Json<TriggerRow>> {
    if body.prompt.is_empty() {
        return Err(ApiError::BadRequest("prompt is required".into()));
    }

    let conn = state.store.conn().map_err(ApiError::from)?;
    let existing = TriggerRepo::get(&conn, &id)?;

    // A changed cron expression recomputes the next occurrence; a cleared
    // one keeps the stored next_run_at (the trigger becomes one-shot).
    let (cron_expr, next_run_at) = if body.cron_expr.is_empty() {
        (None, existing.next_run_at.clone())
    } else if existing.cron_expr.as_deref() == Some(body.cron_expr.as_str()) {
        (Some(body.cron_expr.clone()), existing.next_run_at.clone())
    } else {
        let next = next_cron_occurrence(&body.cron_expr, Utc::now())
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        (Some(body.cron_expr.clone()), Some(next.to_rfc3339()))
    };

    let row = TriggerRepo::update(
        &conn,
        &id,
        &UpdateTriggerParams {
            name: if body.name.is_empty() { existing.name } else { body.name },
            prompt: body.prompt,
            cron_expr,
            enabled: body.enabled,
            next_run_at,
            model: body.model,
            conversation_title: body.conversation_title,
        },
    )?;
    Ok(Json(row))
}

/// `DELETE /api/triggers/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    TriggerRepo::delete(&conn, &id)?;
    Ok(Json(serde_json::json!({})))
}

/// `GET /api/triggers/{id}/runs`
pub async fn runs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<TriggerRunRow>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let _ = TriggerRepo::get(&conn, &id)?;
    Ok(Json(TriggerRunRepo::list_by_trigger(&conn, &id)?))
}
