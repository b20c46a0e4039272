use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::access::{Principal, filters};
use crate::models::Epic;

pub async fn create(
    pool: &PgPool,
    project_id: Uuid,
    creator_id: Uuid,
    title: &str,
    description: &str,
) -> Result<Epic, sqlx::Error> {
    sqlx::query_as::<_, Epic>(
        "INSERT INTO epics (project_id, creator_id, title, description)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(project_id)
    .bind(creator_id)
    .bind(title)
    .bind(description)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Epic>, sqlx::Error> {
    sqlx::query_as::<_, Epic>("SELECT * FROM epics WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Epic>, sqlx::Error> {
    sqlx::query_as::<_, Epic>(
        "SELECT * FROM epics WHERE project_id = $1 ORDER BY created_at ASC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn list(
    pool: &PgPool,
    principal: &Principal,
    project_id: Option<Uuid>,
) -> Result<Vec<Epic>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM epics WHERE true");
    if let Some(project_id) = project_id {
        qb.push(" AND project_id = ");
        qb.push_bind(project_id);
    }
    filters::within_visible_projects(&mut qb, principal, "project_id");
    qb.push(" ORDER BY created_at ASC");
    qb.build_query_as::<Epic>().fetch_all(pool).await
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    title: &str,
    description: &str,
) -> Result<Epic, sqlx::Error> {
    sqlx::query_as::<_, Epic>(
        "UPDATE epics SET title = $2, description = $3, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .fetch_one(pool)
    .await
}
