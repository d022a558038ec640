use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};

pub struct OutboxRow {
    pub id: i64,
    pub msg_id: i64,
    pub topic: String,
    pub payload: serde_json::Value,
    pub retry_count: i32,
}

pub async fn insert_pending(
    tx: &mut Transaction<'_, Postgres>,
    msg_id: i64,
    topic: &str,
    payload: &serde_json::Value,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query!(
        r#"
        INSERT INTO message_outbox (msg_id, topic, payload, status, next_retry_time)
        VALUES ($1, $2, $3, 'pending', now())
        RETURNING id
        "#,
        msg_id,
        topic,
        payload,
    )
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.id)
}

pub async fn mark_sent(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query!(r#"UPDATE message_outbox SET status = 'sent' WHERE id = $1"#, id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Rows eligible for a relay pass: still pending and past their backoff
/// deadline. Relay concurrency is bounded by the advisory lock the caller
/// holds for the tick (see `outbox_relay`), not by row-level locking here.
pub async fn fetch_due(pool: &PgPool, limit: i64) -> Result<Vec<OutboxRow>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, msg_id, topic, payload, retry_count
        FROM message_outbox
        WHERE status = 'pending' AND next_retry_time <= now()
        ORDER BY next_retry_time
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| OutboxRow {
            id: row.get("id"),
            msg_id: row.get("msg_id"),
            topic: row.get("topic"),
            payload: row.get("payload"),
            retry_count: row.get("retry_count"),
        })
        .collect())
}

pub async fn mark_retry(
    pool: &PgPool,
    id: i64,
    next_retry_time: DateTime<Utc>,
    retry_count: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query!(
        r#"UPDATE message_outbox SET retry_count = $2, next_retry_time = $3 WHERE id = $1"#,
        id,
        retry_count,
        next_retry_time,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_failed(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query!(r#"UPDATE message_outbox SET status = 'failed' WHERE id = $1"#, id)
        .execute(pool)
        .await?;
    Ok(())
}
