use sqlx::PgPool;
use uuid::Uuid;

use crate::models::NotificationQueueItem;

pub async fn enqueue(
    pool: &PgPool,
    kind: &str,
    payload: &serde_json::Value,
) -> Result<NotificationQueueItem, sqlx::Error> {
    sqlx::query_as::<_, NotificationQueueItem>(
        "INSERT INTO notification_queue (kind, payload) VALUES ($1, $2) RETURNING *",
    )
    .bind(kind)
    .bind(payload)
    .fetch_one(pool)
    .await
}

/// A `processing` item whose claim is older than this is treated as abandoned
/// by a crashed worker and becomes claimable again.
pub const CLAIM_TIMEOUT_SECS: i64 = 300;

/// Atomically claim the next ready item using SELECT FOR UPDATE SKIP LOCKED.
pub async fn claim_next(pool: &PgPool) -> Result<Option<NotificationQueueItem>, sqlx::Error> {
    sqlx::query_as::<_, NotificationQueueItem>(
        "UPDATE notification_queue
         SET status = 'processing', attempts = attempts + 1, claimed_at = now()
         WHERE id = (
             SELECT id FROM notification_queue
             WHERE (status IN ('pending', 'failed') AND next_retry_at <= now())
                OR (status = 'processing'
                    AND claimed_at < now() - make_interval(secs => $1::double precision))
             ORDER BY next_retry_at ASC
             LIMIT 1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING *",
    )
    .bind(CLAIM_TIMEOUT_SECS as f64)
    .fetch_optional(pool)
    .await
}

pub async fn mark_completed(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE notification_queue SET status = 'completed', completed_at = now() WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Schedule a retry after 2^attempts seconds, or park the item as `dead` once
/// `max_attempts` is reached so it is never claimed again.
pub async fn mark_failed(
    pool: &PgPool,
    item: &NotificationQueueItem,
    error: &str,
) -> Result<(), sqlx::Error> {
    if item.attempts >= item.max_attempts {
        sqlx::query(
            "UPDATE notification_queue
             SET status = 'dead', last_error = $2, completed_at = now()
             WHERE id = $1",
        )
        .bind(item.id)
        .bind(error)
        .execute(pool)
        .await?;
    } else {
        let backoff_secs = 2_i64.pow(item.attempts.max(0) as u32);
        sqlx::query(
            "UPDATE notification_queue
             SET status = 'failed',
                 last_error = $2,
                 next_retry_at = now() + make_interval(secs => $3::double precision)
             WHERE id = $1",
        )
        .bind(item.id)
        .bind(error)
        .bind(backoff_secs as f64)
        .execute(pool)
        .await?;
    }
    Ok(())
}
