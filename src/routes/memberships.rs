use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::predicates::{MEMBERSHIP_READ, MEMBERSHIP_ROLE_CHANGE};
use crate::access::{Principal, ProjectAccess};
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::{ProjectMembership, Role};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct UpdateRole {
    pub role: Role,
}

fn membership_not_found() -> AppError {
    AppError::NotFound("Membership not found".to_string())
}

/// A membership and the principal's access to its project. Memberships of
/// projects the principal cannot see are reported as missing.
async fn visible_membership(
    state: &SharedState,
    principal: &Principal,
    id: Uuid,
) -> Result<(ProjectMembership, ProjectAccess), AppError> {
    let membership = db::memberships::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(membership_not_found)?;
    let project = db::projects::find_by_id(&state.pool, membership.project_id)
        .await?
        .ok_or_else(membership_not_found)?;
    let access = db::memberships::access_for(&state.pool, &project, principal.user_id).await?;
    if !MEMBERSHIP_READ.allows(principal, &access) {
        return Err(membership_not_found());
    }
    Ok((membership, access))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<ProjectMembership>>, AppError> {
    let memberships = db::memberships::list(&state.pool, &auth.principal()).await?;
    Ok(Json(memberships))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectMembership>, AppError> {
    let (membership, _) = visible_membership(&state, &auth.principal(), id).await?;
    Ok(Json(membership))
}

pub async fn update_role(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRole>,
) -> Result<Json<ProjectMembership>, AppError> {
    let principal = auth.principal();
    let (membership, access) = visible_membership(&state, &principal, id).await?;
    MEMBERSHIP_ROLE_CHANGE.check(&principal, &access)?;

    let updated = db::memberships::update_role(&state.pool, membership.id, req.role).await?;

    tracing::info!(
        membership_id = %updated.id,
        project_id = %updated.project_id,
        changed_by = %auth.user_id,
        role = updated.role.as_str(),
        "membership role changed"
    );

    Ok(Json(updated))
}
