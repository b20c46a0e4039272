use sqlx::PgPool;
use uuid::Uuid;

use crate::models::IssueComment;

pub async fn create(
    pool: &PgPool,
    issue_id: Uuid,
    user_id: Uuid,
    content: &str,
) -> Result<IssueComment, sqlx::Error> {
    sqlx::query_as::<_, IssueComment>(
        "INSERT INTO issue_comments (issue_id, user_id, content)
         VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(issue_id)
    .bind(user_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

pub async fn list_for_issue(
    pool: &PgPool,
    issue_id: Uuid,
) -> Result<Vec<IssueComment>, sqlx::Error> {
    sqlx::query_as::<_, IssueComment>(
        "SELECT * FROM issue_comments WHERE issue_id = $1 ORDER BY created_at ASC",
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await
}
