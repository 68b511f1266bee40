//! Filesystem root CRUD handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use blippy_store::repositories::{CreateRootParams, RootRepo};
use blippy_store::rows::RootRow;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RootBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub description: String,
}

fn to_params(body: &RootBody) -> ApiResult<CreateRootParams> {
    if body.name.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    if !body.path.starts_with('/') {
        return Err(ApiError::BadRequest("path must be absolute".into()));
    }
    Ok(CreateRootParams {
        name: body.name.clone(),
        path: body.path.clone(),
        description: body.description.clone(),
    })
}

/// `POST /api/roots`
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<RootBody>,
) -> ApiResult<Json<RootRow>> {
    let params = to_params(&body)?;
    let conn = state.store.conn().map_err(ApiError::from)?;
    Ok(Json(RootRepo::create(&conn, &params)?))
}

/// `GET /api/roots`
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<RootRow>>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    Ok(Json(RootRepo::list(&conn)?))
}

/// `GET /api/roots/{id}`
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RootRow>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    Ok(Json(RootRepo::get(&conn, &id)?))
}

/// `PUT /api/roots/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RootBody>,
) -> ApiResult<Json<RootRow>> {
    let params = to_params(&body)?;
    let conn = state.store.conn().map_err(ApiError::from)?;
    Ok(Json(RootRepo::update(&conn, &id, &params)?))
}

/// `DELETE /api/roots/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let conn = state.store.conn().map_err(ApiError::from)?;
    RootRepo::delete(&conn, &id)?;
    Ok(Json(serde_json::json!({})))
}
