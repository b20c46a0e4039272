use axum::Json;
use axum::extract::{Path, State};

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{Project, User};
use crate::routes::readable_project;
use crate::state::SharedState;

pub async fn me(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<User>, AppError> {
    let user = db::users::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;
    Ok(Json(user))
}

/// Projects are addressable by their creator's username and slug.
pub async fn project_by_slug(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path((username, slug)): Path<(String, String)>,
) -> Result<Json<Project>, AppError> {
    let project = db::projects::find_by_creator_and_slug(&state.pool, &username, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    let (project, _) = readable_project(&state, &auth.principal(), project.id).await?;
    Ok(Json(project))
}
