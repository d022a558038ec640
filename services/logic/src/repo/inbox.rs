use chrono::{DateTime, Utc};
use resonance_wire::{InboxEvent, PushFrame};
use sqlx::{PgPool, Row};

/// `inbox.id > cursor_id ORDER BY id ASC LIMIT limit+1`, the standard
/// cursor-pagination shape: fetch one extra row to learn
/// `has_more` without a second round trip.
pub async fn fetch_delta(
    pool: &PgPool,
    owner_username: &str,
    cursor_id: i64,
    limit: i64,
) -> Result<(Vec<InboxEvent>, bool), sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT i.id, i.msg_id, i.seq_id, i.session_id, m.sender_username, m.content, m.msg_type, m.created_at
        FROM inbox i
        JOIN message_content m ON m.msg_id = i.msg_id
        WHERE i.owner_username = $1 AND i.id > $2
        ORDER BY i.id ASC
        LIMIT $3
        "#,
    )
    .bind(owner_username)
    .bind(cursor_id)
    .bind(limit + 1)
    .fetch_all(pool)
    .await?;

    let has_more = rows.len() as i64 > limit;
    let events = rows
        .into_iter()
        .take(limit as usize)
        .map(|row| {
            let created_at: DateTime<Utc> = row.get("created_at");
            InboxEvent {
                inbox_id: row.get("id"),
                message: PushFrame {
                    msg_id: row.get("msg_id"),
                    seq_id: row.get("seq_id"),
                    session_id: row.get("session_id"),
                    from_username: row.get("sender_username"),
                    content: row.get("content"),
                    msg_type: row.get("msg_type"),
                    timestamp: created_at.timestamp_millis(),
                },
            }
        })
        .collect();
    Ok((events, has_more))
}
