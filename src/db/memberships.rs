use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::access::{Principal, ProjectAccess, filters};
use crate::models::{Project, ProjectMembership, Role};

pub async fn role_of<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Role>, sqlx::Error> {
    let row: Option<(Role,)> = sqlx::query_as(
        "SELECT role FROM project_memberships WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(|(role,)| role))
}

/// Load the user's relationship to the project in one query.
pub async fn access_for<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    project: &Project,
    user_id: Uuid,
) -> Result<ProjectAccess, sqlx::Error> {
    let role = role_of(executor, project.id, user_id).await?;
    Ok(ProjectAccess::new(project, user_id, role))
}

/// `role: None` matches any role.
pub async fn is_member<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    project_id: Uuid,
    role: Option<Role>,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (
             SELECT 1 FROM project_memberships
             WHERE user_id = $1 AND project_id = $2 AND ($3::varchar IS NULL OR role = $3)
         )",
    )
    .bind(user_id)
    .bind(project_id)
    .bind(role)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

pub async fn is_member_or_creator<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    project: &Project,
    role: Option<Role>,
) -> Result<bool, sqlx::Error> {
    if project.creator_id == user_id {
        return Ok(true);
    }
    is_member(executor, user_id, project.id, role).await
}

/// Insert a membership. Returns `None` if the (project, user) pair already exists.
pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    user_id: Uuid,
    role: Role,
) -> Result<Option<ProjectMembership>, sqlx::Error> {
    sqlx::query_as::<_, ProjectMembership>(
        "INSERT INTO project_memberships (project_id, user_id, role)
         VALUES ($1, $2, $3)
         ON CONFLICT (project_id, user_id) DO NOTHING
         RETURNING *",
    )
    .bind(project_id)
    .bind(user_id)
    .bind(role)
    .fetch_optional(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ProjectMembership>, sqlx::Error> {
    sqlx::query_as::<_, ProjectMembership>("SELECT * FROM project_memberships WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_project(
    pool: &PgPool,
    project_id: Uuid,
) -> Result<Vec<ProjectMembership>, sqlx::Error> {
    sqlx::query_as::<_, ProjectMembership>(
        "SELECT * FROM project_memberships WHERE project_id = $1 ORDER BY created_at ASC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn list(
    pool: &PgPool,
    principal: &Principal,
) -> Result<Vec<ProjectMembership>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM project_memberships WHERE true");
    filters::within_visible_projects(&mut qb, principal, "project_id");
    qb.push(" ORDER BY created_at ASC");
    qb.build_query_as::<ProjectMembership>().fetch_all(pool).await
}

pub async fn update_role(
    pool: &PgPool,
    id: Uuid,
    role: Role,
) -> Result<ProjectMembership, sqlx::Error> {
    sqlx::query_as::<_, ProjectMembership>(
        "UPDATE project_memberships SET role = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(role)
    .fetch_one(pool)
    .await
}
