use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::access::predicates::{MEMBERSHIP_READ, PROJECT_DELETE, PROJECT_UPDATE};
use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::{AppError, is_unique_violation};
use crate::invitation::lifecycle;
use crate::models::{Epic, InvitationBody, Issue, Project, ProjectMembership};
use crate::routes::issues::{IssueInput, validate_issue};
use crate::routes::{content_access, readable_project};
use crate::state::SharedState;
use crate::validation;

const MAX_SLUG_LEN: usize = 100;

#[derive(Deserialize)]
pub struct CreateProject {
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct InviteRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct CreateEpic {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

fn slug_conflict(e: sqlx::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::validation(
            "slug",
            "slug_already_exists",
            "You already have a project with this slug",
        )
    } else {
        AppError::Database(e)
    }
}

pub async fn list(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Project>>, AppError> {
    let projects = db::projects::list(&state.pool, &auth.principal()).await?;
    Ok(Json(projects))
}

pub async fn create(
    auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateProject>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let title = req.title.trim();
    validation::require_title(title)?;
    let slug = req.slug.unwrap_or_else(|| default_slug(title));
    validate_slug(&slug)?;

    let project = db::projects::create(&state.pool, auth.user_id, title, &slug, &req.description)
        .await
        .map_err(slug_conflict)?;

    tracing::info!(project_id = %project.id, creator_id = %auth.user_id, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    let (project, _) = readable_project(&state, &auth.principal(), id).await?;
    Ok(Json(project))
}

pub async fn update(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProject>,
) -> Result<Json<Project>, AppError> {
    let principal = auth.principal();
    let (project, access) = readable_project(&state, &principal, id).await?;
    PROJECT_UPDATE.check(&principal, &access)?;

    let title = req
        .title
        .map(|t| t.trim().to_string())
        .unwrap_or(project.title);
    validation::require_title(&title)?;
    let slug = req.slug.unwrap_or(project.slug);
    validate_slug(&slug)?;
    let description = req.description.unwrap_or(project.description);

    let project = db::projects::update(&state.pool, project.id, &title, &slug, &description)
        .await
        .map_err(slug_conflict)?;

    Ok(Json(project))
}

pub async fn delete(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let principal = auth.principal();
    let (project, access) = readable_project(&state, &principal, id).await?;
    PROJECT_DELETE.check(&principal, &access)?;

    db::projects::delete(&state.pool, project.id).await?;

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "project deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_memberships(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ProjectMembership>>, AppError> {
    let principal = auth.principal();
    let (project, access) = readable_project(&state, &principal, id).await?;
    MEMBERSHIP_READ.check(&principal, &access)?;

    let memberships = db::memberships::list_for_project(&state.pool, project.id).await?;
    Ok(Json(memberships))
}

pub async fn invite(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<InviteRequest>,
) -> Result<(StatusCode, Json<InvitationBody>), AppError> {
    let principal = auth.principal();
    let (project, _) = readable_project(&state, &principal, id).await?;

    let invitee = db::users::find_active_by_email(&state.pool, req.email.trim())
        .await?
        .ok_or_else(|| validation::does_not_exist("email"))?;

    let invitation = lifecycle::create(&state.pool, &project, &principal, invitee.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(InvitationBody::new(
            invitation,
            Utc::now(),
            state.config.invitation_lifetime,
        )),
    ))
}

pub async fn list_epics(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Epic>>, AppError> {
    let (project, _) = content_access(&state, &auth.principal(), id, "Project not found").await?;
    let epics = db::epics::list_for_project(&state.pool, project.id).await?;
    Ok(Json(epics))
}

pub async fn create_epic(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateEpic>,
) -> Result<(StatusCode, Json<Epic>), AppError> {
    let (project, _) = content_access(&state, &auth.principal(), id, "Project not found").await?;
    let title = req.title.trim();
    validation::require_title(title)?;

    let epic =
        db::epics::create(&state.pool, project.id, auth.user_id, title, &req.description).await?;
    Ok((StatusCode::CREATED, Json(epic)))
}

pub async fn list_issues(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Issue>>, AppError> {
    let (project, _) = content_access(&state, &auth.principal(), id, "Project not found").await?;
    let issues = db::issues::list_for_project(&state.pool, project.id).await?;
    Ok(Json(issues))
}

pub async fn create_issue(
    auth: AuthUser,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<IssueInput>,
) -> Result<(StatusCode, Json<Issue>), AppError> {
    let (project, _) = content_access(&state, &auth.principal(), id, "Project not found").await?;

    let fields = req.into_new_fields();
    validate_issue(&state, &project, None, &fields).await?;

    let issue = db::issues::create(&state.pool, project.id, auth.user_id, &fields).await?;
    tracing::debug!(issue_id = %issue.id, project_id = %project.id, "issue created");
    Ok((StatusCode::CREATED, Json(issue)))
}

fn slugify(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    slug.chars()
        .take(MAX_SLUG_LEN)
        .collect::<String>()
        .trim_end_matches('-')
        .to_string()
}

/// Titles with no ASCII letters or digits get a random `project-xxxxxxxx` slug.
fn default_slug(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        format!("project-{:08x}", rand::random::<u32>())
    } else {
        slug
    }
}

fn validate_slug(slug: &str) -> Result<(), AppError> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LEN {
        return Err(AppError::validation(
            "slug",
            "invalid_slug",
            format!("Slug must be between 1 and {MAX_SLUG_LEN} characters"),
        ));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(AppError::validation(
            "slug",
            "invalid_slug",
            "Slug must contain only lowercase letters, numbers, and hyphens",
        ));
    }
    Ok(())
}
