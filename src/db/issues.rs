use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::access::{Principal, filters};
use crate::models::{Issue, IssueFields, IssueType};

#[derive(Debug, Default, Deserialize)]
pub struct IssueFilter {
    #[serde(rename = "type")]
    pub issue_type: Option<IssueType>,
    pub project: Option<Uuid>,
    pub epic: Option<Uuid>,
}

pub async fn create(
    pool: &PgPool,
    project_id: Uuid,
    creator_id: Uuid,
    fields: &IssueFields,
) -> Result<Issue, sqlx::Error> {
    sqlx::query_as::<_, Issue>(
        "INSERT INTO issues
             (project_id, creator_id, title, description, status, type, estimate,
              assignee_id, parent_id, epic_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
    )
    .bind(project_id)
    .bind(creator_id)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.status)
    .bind(fields.issue_type)
    .bind(fields.estimate)
    .bind(fields.assignee_id)
    .bind(fields.parent_id)
    .bind(fields.epic_id)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Issue>, sqlx::Error> {
    sqlx::query_as::<_, Issue>("SELECT * FROM issues WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_for_project(pool: &PgPool, project_id: Uuid) -> Result<Vec<Issue>, sqlx::Error> {
    sqlx::query_as::<_, Issue>(
        "SELECT * FROM issues WHERE project_id = $1 ORDER BY created_at ASC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
}

pub async fn list_children(pool: &PgPool, parent_id: Uuid) -> Result<Vec<Issue>, sqlx::Error> {
    sqlx::query_as::<_, Issue>(
        "SELECT * FROM issues WHERE parent_id = $1 ORDER BY created_at ASC",
    )
    .bind(parent_id)
    .fetch_all(pool)
    .await
}

pub async fn list(
    pool: &PgPool,
    principal: &Principal,
    filter: &IssueFilter,
) -> Result<Vec<Issue>, sqlx::Error> {
    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM issues WHERE true");
    if let Some(issue_type) = filter.issue_type {
        qb.push(" AND type = ");
        qb.push_bind(issue_type);
    }
    if let Some(project_id) = filter.project {
        qb.push(" AND project_id = ");
        qb.push_bind(project_id);
    }
    if let Some(epic_id) = filter.epic {
        qb.push(" AND epic_id = ");
        qb.push_bind(epic_id);
    }
    filters::within_visible_projects(&mut qb, principal, "project_id");
    qb.push(" ORDER BY created_at ASC");
    qb.build_query_as::<Issue>().fetch_all(pool).await
}

pub async fn update(pool: &PgPool, id: Uuid, fields: &IssueFields) -> Result<Issue, sqlx::Error> {
    sqlx::query_as::<_, Issue>(
        "UPDATE issues
         SET title = $2, description = $3, status = $4, type = $5, estimate = $6,
             assignee_id = $7, parent_id = $8, epic_id = $9, updated_at = now()
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.status)
    .bind(fields.issue_type)
    .bind(fields.estimate)
    .bind(fields.assignee_id)
    .bind(fields.parent_id)
    .bind(fields.epic_id)
    .fetch_one(pool)
    .await
}
