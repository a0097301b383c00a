//! Handlers for the prompt library.

use super::types::{ApiError, PromptQuery};
use super::AppState;
use crate::prompts::{NewPrompt, PromptTemplate, PromptUpdate};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptListResponse {
    pub prompts: Vec<PromptTemplate>,
    pub categories: Vec<String>,
}

/// GET /api/prompts?search=&category=
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PromptQuery>,
) -> Json<PromptListResponse> {
    let store = state.prompts();
    let prompts = store
        .filter(
            query.search.as_deref().unwrap_or_default(),
            query.category.as_deref(),
        )
        .into_iter()
        .cloned()
        .collect();
    Json(PromptListResponse {
        prompts,
        categories: store.categories(),
    })
}

/// POST /api/prompts
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewPrompt>,
) -> Result<(StatusCode, Json<PromptTemplate>), ApiError> {
    let created = state.prompts().create(new)?;
    tracing::info!(id = %created.id, name = %created.name, "Prompt created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/prompts/:id
pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PromptTemplate>, ApiError> {
    state
        .prompts()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(&format!("Prompt '{}' not found", id)))
}

/// PUT /api/prompts/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<PromptUpdate>,
) -> Result<Json<PromptTemplate>, ApiError> {
    Ok(Json(state.prompts().update(&id, update)?))
}

/// DELETE /api/prompts/:id
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PromptTemplate>, ApiError> {
    let removed = state.prompts().delete(&id)?;
    tracing::info!(id = %removed.id, "Prompt deleted");
    Ok(Json(removed))
}

/// POST /api/prompts/:id/favorite
pub async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PromptTemplate>, ApiError> {
    Ok(Json(state.prompts().toggle_favorite(&id)?))
}

/// POST /api/prompts/:id/duplicate
pub async fn duplicate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<PromptTemplate>), ApiError> {
    let copy = state.prompts().duplicate(&id)?;
    Ok((StatusCode::CREATED, Json(copy)))
}
