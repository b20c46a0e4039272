use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::Epic;
use crate::routes::content_access;
use crate::state::SharedState;
use crate::validation;

#[derive(Deserialize)]
pub struct EpicFilter {
    pub project: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct UpdateEpic {
    pub title: Option<String>,
    pub description: Option<String>,
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<EpicFilter>,
) -> Result<Json<Vec<Epic>>, AppError> {
    let epics = db::epics::list(&state.pool, &auth.principal(), filter.project).await?;
    Ok(Json(epics))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Epic>, AppError> {
    let epic = db::epics::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Epic not found".to_string()))?;
    content_access(&state, &auth.principal(), epic.project_id, "Epic not found").await?;
    Ok(Json(epic))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEpic>,
) -> Result<Json<Epic>, AppError> {
    let epic = db::epics::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Epic not found".to_string()))?;
    content_access(&state, &auth.principal(), epic.project_id, "Epic not found").await?;

    let title = req.title.map(|t| t.trim().to_string()).unwrap_or(epic.title);
    validation::require_title(&title)?;
    let description = req.description.unwrap_or(epic.description);

    let epic = db::epics::update(&state.pool, epic.id, &title, &description).await?;
    Ok(Json(epic))
}
