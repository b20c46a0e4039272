use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::access::{Principal, filters};
use crate::models::Project;

pub async fn list(pool: &PgPool, principal: &Principal) -> Result<Vec<Project>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT p.* FROM projects p WHERE true");
    filters::visible_projects(&mut qb, principal, "p");
    qb.push(" ORDER BY p.created_at DESC");
    qb.build_query_as::<Project>().fetch_all(pool).await
}

pub async fn create(
    pool: &PgPool,
    creator_id: Uuid,
    title: &str,
    slug: &str,
    description: &str,
) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "INSERT INTO projects (creator_id, title, slug, description)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(creator_id)
    .bind(title)
    .bind(slug)
    .bind(description)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_creator_and_slug(
    pool: &PgPool,
    username: &str,
    slug: &str,
) -> Result<Option<Project>, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "SELECT p.* FROM projects p
         JOIN users u ON u.id = p.creator_id
         WHERE u.username = $1 AND p.slug = $2",
    )
    .bind(username)
    .bind(slug)
    .fetch_optional(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    title: &str,
    slug: &str,
    description: &str,
) -> Result<Project, sqlx::Error> {
    sqlx::query_as::<_, Project>(
        "UPDATE projects SET title = $2, slug = $3, description = $4, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(title)
    .bind(slug)
    .bind(description)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
