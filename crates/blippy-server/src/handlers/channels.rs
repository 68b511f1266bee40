//! Notification channel CRUD handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use blippy_store::repositories::{ChannelRepo, CreateChannelParams};
use blippy_store::rows::ChannelRow;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ChannelBody {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub channel_type: String,
    #[serde(default)]
    pub config: serde_json::Value,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub json_schema: serde_json::Value,
}

/// A channel as returned by the API, JSON columns expanded.
#[derive(Debug, Serialize)]
pub struct ChannelView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: String,
    pub config: serde_json::Value,
    pub description: String,
    pub json_schema: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ChannelRow> for ChannelView {
    fn from(row: ChannelRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            channel_type: row.channel_type,
            config: serde_json::from_str(&row.config_json)
                .unwrap_or(serde_json::Value::Object(Default::default())),
            description: row.description,
            json_schema: serde_json::from_str(&row.json_schema_json)
                .unwrap_or(serde_json::Value::Null),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn to_params(body: &ChannelBody) -> ApiResult<CreateChannelParams> {
    if body.name.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    if body.channel_type.is_empty() {
        return Err(ApiError::BadRequest("type is required".into()));
    }
    let json_schema_json = if body.json_schema.is_null() {
        String::new()
    } else {
        body.json_schema.to_string()
    };
    Ok(CreateChannelParams {
        name: body.name.clone(),
        channel_type: body.channel_type.clone(),
        config_json: body.config.to_string(),
        description: body.description.clone(),
        json_schema_json,
    })
}

/// `POST /api/channels`
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<ChannelBody>,
) -> ApiResult<Json<ChannelView>> {
    let params = to_params(&body)?;
    let conn = state.store.conn().map_err(ApiError::from)?;
    let row = ChannelRepo::create(&conn, &params)?;
    Ok(Json(row.into()))
}

/// `GET /api/channels`
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<ChannelView>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    let rows = ChannelRepo::list(&conn)?;
    Ok(Json(rows.into_iter().map(ChannelView::from).collect()))
}

/// `GET /api/channels/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ChannelView>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    Ok(Json(ChannelRepo::get(&conn, &id)?.into()))
}

/// `PUT /api/channels/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ChannelBody>,
) -> ApiResult<Json<ChannelView>> {
    let params = to_params(&body)?;
    let conn = state.store.conn().map_err(ApiError::from)?;
    Ok(Json(ChannelRepo::update(&conn, &id, &params)?.into()))
}

/// `DELETE /api/channels/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    ChannelRepo::delete(&conn, &id)?;
    Ok(Json(serde_json::json!({})))
}
