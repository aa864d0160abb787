use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use codestock_core::models::snippet::{NewSnippet, Snippet, SnippetPatch, parse_id};
use codestock_storage::snippets::ListFilter;

use crate::error::{ApiError, MSG_NOT_FOUND};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    section: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
pub struct DeleteAck {
    success: bool,
}

pub async fn list_snippets(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<Snippet>>, ApiError> {
    let Query(params) = params?;
    let filter = ListFilter {
        section: params.section,
        limit: params.limit,
    };
    let snippets = state.gateway()?.list(&filter).await?;
    Ok(Json(snippets))
}

pub async fn get_snippet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Snippet>, ApiError> {
    let id = parse_id(&id)?;
    let snippet = state.gateway()?.get(id).await?;
    Ok(Json(snippet))
}

pub async fn create_snippet(
    State(state): State<AppState>,
    payload: Result<Json<NewSnippet>, JsonRejection>,
) -> Result<(StatusCode, Json<Snippet>), ApiError> {
    let Json(snippet) = payload?;
    let created = state.gateway()?.create(snippet).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_snippet(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<SnippetPatch>, JsonRejection>,
) -> Result<Json<Snippet>, ApiError> {
    let id = parse_id(&id)?;
    let Json(patch) = payload?;
    state
        .gateway()?
        .update(id, patch)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(MSG_NOT_FOUND.to_string()))
}

pub async fn delete_snippet(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteAck>, ApiError> {
    let id = parse_id(&id)?;
    if !state.gateway()?.remove(id).await? {
        return Err(ApiError::NotFound(MSG_NOT_FOUND.to_string()));
    }
    Ok(Json(DeleteAck { success: true }))
}
