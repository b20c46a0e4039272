use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::LoggedTime;

pub async fn create(
    pool: &PgPool,
    issue_id: Uuid,
    user_id: Uuid,
    time: Decimal,
    comment: &str,
) -> Result<LoggedTime, sqlx::Error> {
    sqlx::query_as::<_, LoggedTime>(
        "INSERT INTO logged_time (issue_id, user_id, time, comment)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(issue_id)
    .bind(user_id)
    .bind(time)
    .bind(comment)
    .fetch_one(pool)
    .await
}

pub async fn list_for_issue(pool: &PgPool, issue_id: Uuid) -> Result<Vec<LoggedTime>, sqlx::Error> {
    sqlx::query_as::<_, LoggedTime>(
        "SELECT * FROM logged_time WHERE issue_id = $1 ORDER BY created_at ASC",
    )
    .bind(issue_id)
    .fetch_all(pool)
    .await
}
