use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::access::{Principal, filters};
use crate::models::{InvitationStatus, ProjectInvitation};

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    project_id: Uuid,
    inviter_id: Uuid,
    user_id: Uuid,
) -> Result<ProjectInvitation, sqlx::Error> {
    sqlx::query_as::<_, ProjectInvitation>(
        "INSERT INTO project_invitations (project_id, inviter_id, user_id)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(project_id)
    .bind(inviter_id)
    .bind(user_id)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<ProjectInvitation>, sqlx::Error> {
    sqlx::query_as::<_, ProjectInvitation>("SELECT * FROM project_invitations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Row-locking read for use inside a transaction.
pub async fn find_for_update<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<ProjectInvitation>, sqlx::Error> {
    sqlx::query_as::<_, ProjectInvitation>(
        "SELECT * FROM project_invitations WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn pending_exists<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    project_id: Uuid,
    inviter_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row: (bool,) = sqlx::query_as(
        "SELECT EXISTS (
             SELECT 1 FROM project_invitations
             WHERE user_id = $1 AND project_id = $2 AND inviter_id = $3 AND status = 'pending'
         )",
    )
    .bind(user_id)
    .bind(project_id)
    .bind(inviter_id)
    .fetch_one(executor)
    .await?;
    Ok(row.0)
}

pub async fn list(
    pool: &PgPool,
    principal: &Principal,
) -> Result<Vec<ProjectInvitation>, sqlx::Error> {
    let mut qb =
        QueryBuilder::<Postgres>::new("SELECT i.* FROM project_invitations i WHERE true");
    filters::visible_invitations(&mut qb, principal, "i");
    qb.push(" ORDER BY i.created_at DESC");
    qb.build_query_as::<ProjectInvitation>().fetch_all(pool).await
}

/// Compare-and-swap out of `pending`. Returns `None` if the row was no longer pending.
pub async fn resolve<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    status: InvitationStatus,
) -> Result<Option<ProjectInvitation>, sqlx::Error> {
    sqlx::query_as::<_, ProjectInvitation>(
        "UPDATE project_invitations SET status = $2, updated_at = now()
         WHERE id = $1 AND status = 'pending'
         RETURNING *",
    )
    .bind(id)
    .bind(status)
    .fetch_optional(executor)
    .await
}
