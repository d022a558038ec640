use chrono::{DateTime, Utc};
use resonance_wire::PushFrame;
use sqlx::{PgPool, Postgres, Transaction};

pub async fn insert_message_content(
    tx: &mut Transaction<'_, Postgres>,
    msg_id: i64,
    session_id: &str,
    sender_username: &str,
    seq_id: i64,
    content: &str,
    msg_type: &str,
) -> Result<DateTime<Utc>, sqlx::Error> {
    let row = sqlx::query!(
        r#"
        INSERT INTO message_content (msg_id, session_id, sender_username, seq_id, content, msg_type)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING created_at
        "#,
        msg_id,
        session_id,
        sender_username,
        seq_id,
        content,
        msg_type,
    )
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.created_at)
}

/// `seq_id < before_seq ORDER BY seq_id DESC LIMIT limit`, then reversed to
/// ascending order for client rendering.
pub async fn recent_messages(
    pool: &PgPool,
    session_id: &str,
    before_seq: i64,
    limit: i64,
) -> Result<Vec<PushFrame>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT msg_id, seq_id, sender_username, content, msg_type, created_at
        FROM message_content
        WHERE session_id = $1 AND seq_id < $2
        ORDER BY seq_id DESC
        LIMIT $3
        "#,
    )
    .bind(session_id)
    .bind(before_seq)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut messages: Vec<PushFrame> = rows
        .iter()
        .map(|row| {
            use sqlx::Row;
            let created_at: DateTime<Utc> = row.get("created_at");
            PushFrame {
                msg_id: row.get("msg_id"),
                seq_id: row.get("seq_id"),
                session_id: session_id.to_owned(),
                from_username: row.get("sender_username"),
                content: row.get("content"),
                msg_type: row.get("msg_type"),
                timestamp: created_at.timestamp_millis(),
            }
        })
        .collect();
    messages.reverse();
    Ok(messages)
}
