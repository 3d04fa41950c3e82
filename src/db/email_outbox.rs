use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{OutboxMessage, OutboxStats};

pub async fn insert(
    pool: &PgPool,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<OutboxMessage, sqlx::Error> {
    sqlx::query_as::<_, OutboxMessage>(
        "INSERT INTO email_outbox (id, to_addr, subject, body)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(to)
    .bind(subject)
    .bind(body)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<OutboxMessage>, sqlx::Error> {
    sqlx::query_as::<_, OutboxMessage>("SELECT * FROM email_outbox WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Oldest unsent rows that still have attempts left, at most `limit` of them.
pub async fn fetch_eligible(
    pool: &PgPool,
    max_attempts: i32,
    limit: i64,
) -> Result<Vec<OutboxMessage>, sqlx::Error> {
    sqlx::query_as::<_, OutboxMessage>(
        "SELECT * FROM email_outbox
         WHERE sent = false AND attempts < $1
         ORDER BY created_at ASC, id ASC
         LIMIT $2",
    )
    .bind(max_attempts)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Record a successful delivery. Returns false if the row was already sent.
pub async fn mark_sent(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE email_outbox SET sent = true, sent_at = now(), error = NULL
         WHERE id = $1 AND sent = false",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Record a failed delivery attempt.
pub async fn mark_failed(pool: &PgPool, id: Uuid, error: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE email_outbox SET attempts = attempts + 1, error = $2
         WHERE id = $1 AND sent = false",
    )
    .bind(id)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn stats(pool: &PgPool, max_attempts: i32) -> Result<OutboxStats, sqlx::Error> {
    sqlx::query_as::<_, OutboxStats>(
        "SELECT
             COUNT(*) FILTER (WHERE sent = false AND attempts < $1) AS pending,
             COUNT(*) FILTER (WHERE sent = true) AS sent,
             COUNT(*) FILTER (WHERE sent = false AND attempts >= $1) AS exhausted
         FROM email_outbox",
    )
    .bind(max_attempts)
    .fetch_one(pool)
    .await
}
