use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const PROJECT_INVITATION: &str = "project_invitation";
pub const USER_ACTIVATION: &str = "user_activation";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationQueueItem {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub last_error: Option<String>,
    pub next_retry_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
