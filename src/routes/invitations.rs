use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use uuid::Uuid;

use crate::access::Principal;
use crate::access::predicates::can_view_invitation;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::invitation::lifecycle;
use crate::models::{InvitationBody, ProjectInvitation};
use crate::state::SharedState;

async fn visible_invitation(
    state: &SharedState,
    principal: &Principal,
    id: Uuid,
) -> Result<ProjectInvitation, AppError> {
    db::invitations::find_by_id(&state.pool, id)
        .await?
        .filter(|inv| can_view_invitation(principal, inv))
        .ok_or_else(|| AppError::NotFound("Invitation not found".to_string()))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<InvitationBody>>, AppError> {
    let now = Utc::now();
    let lifetime = state.config.invitation_lifetime;
    let invitations = db::invitations::list(&state.pool, &auth.principal())
        .await?
        .into_iter()
        .map(|inv| InvitationBody::new(inv, now, lifetime))
        .collect();
    Ok(Json(invitations))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvitationBody>, AppError> {
    let invitation = visible_invitation(&state, &auth.principal(), id).await?;
    Ok(Json(InvitationBody::new(
        invitation,
        Utc::now(),
        state.config.invitation_lifetime,
    )))
}

pub async fn accept(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let invitation = visible_invitation(&state, &auth.principal(), id).await?;
    lifecycle::accept(
        &state.pool,
        invitation.id,
        auth.user_id,
        Utc::now(),
        state.config.invitation_lifetime,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reject(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let invitation = visible_invitation(&state, &auth.principal(), id).await?;
    lifecycle::reject(
        &state.pool,
        invitation.id,
        auth.user_id,
        Utc::now(),
        state.config.invitation_lifetime,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
