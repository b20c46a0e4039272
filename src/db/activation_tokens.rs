use chrono::{DateTime, Utc};
use uuid::Uuid;

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
    token_hash: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activation_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(expires_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Delete the token and return its owner when it has not expired.
pub async fn consume<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    token_hash: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    let row: Option<(Uuid, DateTime<Utc>)> = sqlx::query_as(
        "DELETE FROM activation_tokens WHERE token_hash = $1 RETURNING user_id, expires_at",
    )
    .bind(token_hash)
    .fetch_optional(executor)
    .await?;
    Ok(row.and_then(|(user_id, expires_at)| (expires_at > Utc::now()).then_some(user_id)))
}

pub async fn delete_all_for_user<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM activation_tokens WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}
