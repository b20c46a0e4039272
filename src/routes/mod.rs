pub mod auth;
pub mod epics;
pub mod invitations;
pub mod issues;
pub mod memberships;
pub mod projects;
pub mod users;

use axum::Router;
use axum::routing::{get, post};
use uuid::Uuid;

use crate::access::predicates::{PROJECT_CONTENT, PROJECT_READ};
use crate::access::{Principal, ProjectAccess};
use crate::db;
use crate::error::AppError;
use crate::models::Project;
use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/activate", post(auth::activate))
        .route("/api/v1/auth/activate/resend", post(auth::resend_activation))
        .route("/api/v1/auth/verify", post(auth::verify))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        // Users
        .route("/api/v1/users/me", get(users::me))
        .route(
            "/api/v1/users/{username}/projects/{slug}",
            get(users::project_by_slug),
        )
        // Projects
        .route("/api/v1/projects", get(projects::list).post(projects::create))
        .route(
            "/api/v1/projects/{id}",
            get(projects::get)
                .patch(projects::update)
                .delete(projects::delete),
        )
        .route(
            "/api/v1/projects/{id}/memberships",
            get(projects::list_memberships),
        )
        .route(
            "/api/v1/projects/{id}/invitations",
            post(projects::invite),
        )
        .route(
            "/api/v1/projects/{id}/epics",
            get(projects::list_epics).post(projects::create_epic),
        )
        .route(
            "/api/v1/projects/{id}/issues",
            get(projects::list_issues).post(projects::create_issue),
        )
        // Invitations
        .route("/api/v1/invitations", get(invitations::list))
        .route("/api/v1/invitations/{id}", get(invitations::get))
        .route("/api/v1/invitations/{id}/accept", post(invitations::accept))
        .route("/api/v1/invitations/{id}/reject", post(invitations::reject))
        // Memberships
        .route("/api/v1/memberships", get(memberships::list))
        .route(
            "/api/v1/memberships/{id}",
            get(memberships::get).patch(memberships::update_role),
        )
        // Epics
        .route("/api/v1/epics", get(epics::list))
        .route("/api/v1/epics/{id}", get(epics::get).patch(epics::update))
        // Issues
        .route("/api/v1/issues", get(issues::list))
        .route("/api/v1/issues/{id}", get(issues::get).patch(issues::update))
        .route("/api/v1/issues/{id}/sub-issues", get(issues::sub_issues))
        .route(
            "/api/v1/issues/{id}/logged-time",
            get(issues::list_logged_time).post(issues::log_time),
        )
        .route(
            "/api/v1/issues/{id}/comments",
            get(issues::list_comments).post(issues::create_comment),
        )
}

fn project_not_found() -> AppError {
    AppError::NotFound("Project not found".to_string())
}

/// Load a project the principal may read. Unreadable projects are reported as missing.
pub(crate) async fn readable_project(
    state: &SharedState,
    principal: &Principal,
    id: Uuid,
) -> Result<(Project, ProjectAccess), AppError> {
    let project = db::projects::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(project_not_found)?;
    let access = db::memberships::access_for(&state.pool, &project, principal.user_id).await?;
    if !PROJECT_READ.allows(principal, &access) {
        return Err(project_not_found());
    }
    Ok((project, access))
}

/// Access to epics, issues and their children: the project has to be visible,
/// and the principal has to be its creator or a member. Staff see everything
/// but only act inside their own projects.
pub(crate) async fn content_access(
    state: &SharedState,
    principal: &Principal,
    project_id: Uuid,
    not_found: &str,
) -> Result<(Project, ProjectAccess), AppError> {
    let (project, access) = readable_project(state, principal, project_id)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound(not_found.to_string()),
            other => other,
        })?;
    PROJECT_CONTENT.check(principal, &access)?;
    Ok((project, access))
}
