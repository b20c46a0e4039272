use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum IssueStatus {
    #[default]
    New,
    InProgress,
    Closed,
    ReleaseReady,
}

/// Task, bug and user story share one table; the type is a tag, not a separate entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    #[default]
    Task,
    UserStory,
    Bug,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Issue {
    pub id: Uuid,
    pub project_id: Uuid,
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub epic_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub estimate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The writable part of an issue, after validation.
#[derive(Debug, Clone)]
pub struct IssueFields {
    pub title: String,
    pub description: String,
    pub status: IssueStatus,
    pub issue_type: IssueType,
    pub estimate: Decimal,
    pub assignee_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub epic_id: Option<Uuid>,
}

impl From<&Issue> for IssueFields {
    fn from(issue: &Issue) -> Self {
        Self {
            title: issue.title.clone(),
            description: issue.description.clone(),
            status: issue.status,
            issue_type: issue.issue_type,
            estimate: issue.estimate,
            assignee_id: issue.assignee_id,
            parent_id: issue.parent_id,
            epic_id: issue.epic_id,
        }
    }
}
