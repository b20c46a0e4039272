//! Project invitation lifecycle: `pending` → `accepted` | `rejected`.
//!
//! The checks that decide whether a transition is allowed are pure and live
//! here; `lifecycle` runs them against storage, inside a transaction where
//! the transition has to be atomic.

pub mod lifecycle;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{InvitationStatus, ProjectInvitation};

#[derive(Debug)]
pub enum InvitationError {
    InviterNotMaintainerOrCreator,
    UserAlreadyMember,
    PendingInvitationExists,
    NotInvitedUser,
    NotPending,
    Expired,
    NotFound,
    Database(sqlx::Error),
}

impl InvitationError {
    /// Stable code reported to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            InvitationError::InviterNotMaintainerOrCreator => {
                "inviter_is_not_a_maintainer_or_a_creator"
            }
            InvitationError::UserAlreadyMember => "user_is_already_a_member",
            InvitationError::PendingInvitationExists => "pending_invitation_already_exists",
            InvitationError::NotInvitedUser => "not_the_invited_user",
            InvitationError::NotPending => "invitation_is_not_pending",
            InvitationError::Expired => "invitation_has_expired",
            InvitationError::NotFound => "not_found",
            InvitationError::Database(_) => "internal",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            InvitationError::InviterNotMaintainerOrCreator => {
                "The inviter must be a maintainer or the creator of the project \
                 to be able to invite new users."
            }
            InvitationError::UserAlreadyMember => "The user is already a member of the project.",
            InvitationError::PendingInvitationExists => {
                "There is already a pending invitation for the user to join the project."
            }
            InvitationError::NotInvitedUser => {
                "Access to the invitation is granted only to the invited user."
            }
            InvitationError::NotPending => "The requested project invitation is not pending.",
            InvitationError::Expired => "The invitation has already expired.",
            InvitationError::NotFound => "Invitation not found",
            InvitationError::Database(_) => "Internal server error",
        }
    }
}

impl std::fmt::Display for InvitationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvitationError::Database(err) => write!(f, "Database Error: {err}"),
            other => write!(f, "{}: {}", other.code(), other.message()),
        }
    }
}

impl From<sqlx::Error> for InvitationError {
    fn from(err: sqlx::Error) -> Self {
        InvitationError::Database(err)
    }
}

impl From<InvitationError> for AppError {
    fn from(err: InvitationError) -> Self {
        match err {
            InvitationError::Database(e) => AppError::Database(e),
            InvitationError::NotFound => AppError::NotFound(err.message().to_string()),
            InvitationError::NotInvitedUser => AppError::Forbidden(err.message().to_string()),
            other => AppError::StateConflict {
                code: other.code(),
                message: other.message().to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Accept,
    Reject,
}

impl Transition {
    pub fn target(&self) -> InvitationStatus {
        match self {
            Transition::Accept => InvitationStatus::Accepted,
            Transition::Reject => InvitationStatus::Rejected,
        }
    }
}

/// Preconditions shared by accept and reject, in the order they are reported:
/// the actor must be the invited user, the invitation must be pending, and it
/// must not have expired.
pub fn check_can_respond(
    invitation: &ProjectInvitation,
    actor: Uuid,
    now: DateTime<Utc>,
    lifetime: Duration,
) -> Result<(), InvitationError> {
    if invitation.user_id != actor {
        return Err(InvitationError::NotInvitedUser);
    }
    if !invitation.is_pending() {
        return Err(InvitationError::NotPending);
    }
    if invitation.is_expired(now, lifetime) {
        return Err(InvitationError::Expired);
    }
    Ok(())
}
