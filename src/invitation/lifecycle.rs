use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::access::Principal;
use crate::access::predicates::PROJECT_INVITE;
use crate::db;
use crate::error::is_unique_violation;
use crate::invitation::{InvitationError, Transition, check_can_respond};
use crate::models::notification::PROJECT_INVITATION;
use crate::models::{Project, ProjectInvitation, ProjectMembership, Role};

/// Create a pending invitation and schedule the notification email.
///
/// The email is queued after the insert and is fire-and-forget: a failure to
/// queue is logged and does not affect the returned invitation.
pub async fn create(
    pool: &PgPool,
    project: &Project,
    inviter: &Principal,
    user_id: Uuid,
) -> Result<ProjectInvitation, InvitationError> {
    let inviter_access = db::memberships::access_for(pool, project, inviter.user_id).await?;
    if !PROJECT_INVITE.allows(inviter, &inviter_access) {
        return Err(InvitationError::InviterNotMaintainerOrCreator);
    }

    if db::memberships::is_member_or_creator(pool, user_id, project, None).await? {
        return Err(InvitationError::UserAlreadyMember);
    }

    if db::invitations::pending_exists(pool, user_id, project.id, inviter.user_id).await? {
        return Err(InvitationError::PendingInvitationExists);
    }

    let invitation = db::invitations::create(pool, project.id, inviter.user_id, user_id)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                InvitationError::PendingInvitationExists
            } else {
                InvitationError::Database(e)
            }
        })?;

    tracing::info!(
        invitation_id = %invitation.id,
        project_id = %project.id,
        inviter_id = %inviter.user_id,
        user_id = %user_id,
        "project invitation created"
    );

    if let Err(e) = db::notifications::enqueue(
        pool,
        PROJECT_INVITATION,
        &json!({ "invitation_id": invitation.id }),
    )
    .await
    {
        tracing::warn!(invitation_id = %invitation.id, "Failed to queue invitation email: {e}");
    }

    Ok(invitation)
}

/// Accept an invitation: create a developer membership and mark the
/// invitation accepted in one transaction.
///
/// The invitation row is locked before any check runs, so two concurrent
/// accepts serialize and the second one observes `NotPending`.
pub async fn accept(
    pool: &PgPool,
    invitation_id: Uuid,
    actor: Uuid,
    now: DateTime<Utc>,
    lifetime: Duration,
) -> Result<ProjectMembership, InvitationError> {
    let mut tx = pool.begin().await?;

    let invitation = db::invitations::find_for_update(&mut *tx, invitation_id)
        .await?
        .ok_or(InvitationError::NotFound)?;

    check_can_respond(&invitation, actor, now, lifetime)?;

    if db::memberships::is_member(&mut *tx, invitation.user_id, invitation.project_id, None)
        .await?
    {
        return Err(InvitationError::UserAlreadyMember);
    }

    let membership = db::memberships::create(
        &mut *tx,
        invitation.project_id,
        invitation.user_id,
        Role::Developer,
    )
    .await?
    .ok_or(InvitationError::UserAlreadyMember)?;

    db::invitations::resolve(&mut *tx, invitation.id, Transition::Accept.target())
        .await?
        .ok_or(InvitationError::NotPending)?;

    tx.commit().await?;

    log_transition(&invitation, Transition::Accept);
    Ok(membership)
}

/// Reject an invitation. Same preconditions as accept; a single conditional
/// status write, no membership is created.
pub async fn reject(
    pool: &PgPool,
    invitation_id: Uuid,
    actor: Uuid,
    now: DateTime<Utc>,
    lifetime: Duration,
) -> Result<ProjectInvitation, InvitationError> {
    let invitation = db::invitations::find_by_id(pool, invitation_id)
        .await?
        .ok_or(InvitationError::NotFound)?;

    check_can_respond(&invitation, actor, now, lifetime)?;

    if db::memberships::is_member(pool, invitation.user_id, invitation.project_id, None).await? {
        return Err(InvitationError::UserAlreadyMember);
    }

    let rejected = db::invitations::resolve(pool, invitation.id, Transition::Reject.target())
        .await?
        .ok_or(InvitationError::NotPending)?;

    log_transition(&invitation, Transition::Reject);
    Ok(rejected)
}

fn log_transition(invitation: &ProjectInvitation, transition: Transition) {
    tracing::info!(
        invitation_id = %invitation.id,
        project_id = %invitation.project_id,
        user_id = %invitation.user_id,
        status = ?transition.target(),
        "project invitation resolved"
    );
}
