use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::access::Principal;
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::db::issues::IssueFilter;
use crate::error::AppError;
use crate::models::{
    Issue, IssueComment, IssueFields, IssueStatus, IssueType, LoggedTime, Project,
};
use crate::routes::content_access;
use crate::state::SharedState;
use crate::validation;

/// Distinguishes an absent key (`None`) from an explicit `null` (`Some(None)`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Issue body for create and partial update. Relations are given by id.
#[derive(Debug, Default, Deserialize)]
pub struct IssueInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<IssueStatus>,
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
    pub estimate: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable", alias = "assignee_id")]
    pub assignee: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable", alias = "parent_id")]
    pub parent: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "nullable", alias = "epic_id")]
    pub epic: Option<Option<Uuid>>,
}

impl IssueInput {
    /// Overlay the supplied keys on `base`.
    pub fn apply(self, base: IssueFields) -> IssueFields {
        IssueFields {
            title: self.title.map(|t| t.trim().to_string()).unwrap_or(base.title),
            description: self.description.unwrap_or(base.description),
            status: self.status.unwrap_or(base.status),
            issue_type: self.issue_type.unwrap_or(base.issue_type),
            estimate: self.estimate.unwrap_or(base.estimate),
            assignee_id: self.assignee.unwrap_or(base.assignee_id),
            parent_id: self.parent.unwrap_or(base.parent_id),
            epic_id: self.epic.unwrap_or(base.epic_id),
        }
    }

    pub fn into_new_fields(self) -> IssueFields {
        self.apply(IssueFields {
            title: String::new(),
            description: String::new(),
            status: IssueStatus::default(),
            issue_type: IssueType::default(),
            estimate: Decimal::ZERO,
            assignee_id: None,
            parent_id: None,
            epic_id: None,
        })
    }
}

/// Field checks plus the cross-entity rules: epic and parent live in the
/// issue's project, the assignee is an active member or the creator.
pub(crate) async fn validate_issue(
    state: &SharedState,
    project: &Project,
    issue_id: Option<Uuid>,
    fields: &IssueFields,
) -> Result<(), AppError> {
    validation::require_title(&fields.title)?;
    validation::require_estimate(fields.estimate)?;
    validation::require_not_own_parent(issue_id, fields.parent_id)?;

    if let Some(epic_id) = fields.epic_id {
        let epic = db::epics::find_by_id(&state.pool, epic_id)
            .await?
            .ok_or_else(|| validation::does_not_exist("epic"))?;
        validation::require_epic_in_project(project.id, epic.project_id)?;
    }

    if let Some(parent_id) = fields.parent_id {
        let parent = db::issues::find_by_id(&state.pool, parent_id)
            .await?
            .ok_or_else(|| validation::does_not_exist("parent"))?;
        validation::require_parent_in_project(project.id, parent.project_id)?;
    }

    if let Some(assignee_id) = fields.assignee_id {
        if !db::users::is_active(&state.pool, assignee_id).await? {
            return Err(validation::does_not_exist("assignee"));
        }
        if !db::memberships::is_member_or_creator(&state.pool, assignee_id, project, None).await? {
            return Err(AppError::validation(
                "assignee",
                "assignee_is_not_a_member",
                "The assignee must be a member or the creator of the project.",
            ));
        }
    }

    Ok(())
}

/// Load an issue and check the principal may work with it.
async fn accessible_issue(
    state: &SharedState,
    principal: &Principal,
    id: Uuid,
) -> Result<(Issue, Project), AppError> {
    let issue = db::issues::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Issue not found".to_string()))?;
    let (project, _) = content_access(state, principal, issue.project_id, "Issue not found").await?;
    Ok((issue, project))
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
    Query(filter): Query<IssueFilter>,
) -> Result<Json<Vec<Issue>>, AppError> {
    let issues = db::issues::list(&state.pool, &auth.principal(), &filter).await?;
    Ok(Json(issues))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Issue>, AppError> {
    let (issue, _) = accessible_issue(&state, &auth.principal(), id).await?;
    Ok(Json(issue))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<IssueInput>,
) -> Result<Json<Issue>, AppError> {
    let (issue, project) = accessible_issue(&state, &auth.principal(), id).await?;

    let fields = req.apply(IssueFields::from(&issue));
    validate_issue(&state, &project, Some(issue.id), &fields).await?;

    let issue = db::issues::update(&state.pool, issue.id, &fields).await?;
    tracing::debug!(issue_id = %issue.id, user_id = %auth.user_id, "issue updated");
    Ok(Json(issue))
}

pub async fn sub_issues(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Issue>>, AppError> {
    let (issue, _) = accessible_issue(&state, &auth.principal(), id).await?;
    let children = db::issues::list_children(&state.pool, issue.id).await?;
    Ok(Json(children))
}

#[derive(Deserialize)]
pub struct LogTimeRequest {
    pub time: Decimal,
    #[serde(default)]
    pub comment: String,
}

pub async fn list_logged_time(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<LoggedTime>>, AppError> {
    let (issue, _) = accessible_issue(&state, &auth.principal(), id).await?;
    let entries = db::logged_time::list_for_issue(&state.pool, issue.id).await?;
    Ok(Json(entries))
}

pub async fn log_time(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<LogTimeRequest>,
) -> Result<(StatusCode, Json<LoggedTime>), AppError> {
    let (issue, _) = accessible_issue(&state, &auth.principal(), id).await?;
    validation::require_logged_time(req.time)?;

    let entry =
        db::logged_time::create(&state.pool, issue.id, auth.user_id, req.time, &req.comment)
            .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

pub async fn list_comments(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<IssueComment>>, AppError> {
    let (issue, _) = accessible_issue(&state, &auth.principal(), id).await?;
    let comments = db::comments::list_for_issue(&state.pool, issue.id).await?;
    Ok(Json(comments))
}

pub async fn create_comment(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<(StatusCode, Json<IssueComment>), AppError> {
    let (issue, _) = accessible_issue(&state, &auth.principal(), id).await?;
    validation::require_content(&req.content)?;

    let comment = db::comments::create(&state.pool, issue.id, auth.user_id, &req.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> IssueInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn absent_keys_keep_current_values() {
        let epic = Uuid::now_v7();
        let base = IssueInput {
            title: Some("Old".into()),
            epic: Some(Some(epic)),
            ..Default::default()
        }
        .into_new_fields();

        let fields = parse(r#"{"status": "in-progress"}"#).apply(base);
        assert_eq!(fields.title, "Old");
        assert_eq!(fields.status, IssueStatus::InProgress);
        assert_eq!(fields.epic_id, Some(epic));
    }

    #[test]
    fn explicit_null_clears_a_relation() {
        let base = IssueInput {
            title: Some("Old".into()),
            assignee: Some(Some(Uuid::now_v7())),
            ..Default::default()
        }
        .into_new_fields();

        let fields = parse(r#"{"assignee": null}"#).apply(base);
        assert_eq!(fields.assignee_id, None);
    }

    #[test]
    fn new_issue_defaults() {
        let fields = parse(r#"{"title": " Crash on save ", "type": "bug", "estimate": "1.5"}"#)
            .into_new_fields();
        assert_eq!(fields.title, "Crash on save");
        assert_eq!(fields.issue_type, IssueType::Bug);
        assert_eq!(fields.status, IssueStatus::New);
        assert_eq!(fields.estimate, Decimal::new(15, 1));
        assert_eq!(fields.parent_id, None);
    }

    #[test]
    fn id_aliases_are_accepted() {
        let epic = Uuid::now_v7();
        let input = parse(&format!(r#"{{"epic_id": "{epic}"}}"#));
        assert_eq!(input.epic, Some(Some(epic)));
    }
}
