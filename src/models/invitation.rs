use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ProjectInvitation {
    pub id: Uuid,
    pub project_id: Uuid,
    pub inviter_id: Uuid,
    pub user_id: Uuid,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectInvitation {
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    /// Expired strictly after `created_at + lifetime`; the boundary itself is still valid.
    pub fn is_expired(&self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        now > self.created_at + lifetime
    }
}

/// Invitation as returned by the API, with the derived `is_active` flag.
#[derive(Debug, Clone, Serialize)]
pub struct InvitationBody {
    #[serde(flatten)]
    pub invitation: ProjectInvitation,
    pub is_active: bool,
}

impl InvitationBody {
    pub fn new(invitation: ProjectInvitation, now: DateTime<Utc>, lifetime: Duration) -> Self {
        let is_active = !invitation.is_expired(now, lifetime);
        Self {
            invitation,
            is_active,
        }
    }
}
