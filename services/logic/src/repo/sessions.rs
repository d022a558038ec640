use resonance_wire::{PushFrame, SessionInfo};
use sqlx::{PgPool, Postgres, Transaction};

pub struct MemberRow {
    pub username: String,
    pub last_read_seq: i64,
}

pub async fn load_members(pool: &PgPool, session_id: &str) -> Result<Vec<MemberRow>, sqlx::Error> {
    let rows = sqlx::query_as!(
        MemberRow,
        r#"SELECT username, last_read_seq FROM session_members WHERE session_id = $1"#,
        session_id,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub fn is_member(members: &[MemberRow], username: &str) -> bool {
    members.iter().any(|m| m.username == username)
}

pub async fn max_seq_id(pool: &PgPool, session_id: &str) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query!(
        r#"SELECT max_seq_id FROM sessions WHERE session_id = $1"#,
        session_id,
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.max_seq_id))
}

/// `SET max_seq_id = new_seq WHERE max_seq_id < new_seq` -- a CAS that never
/// regresses the high-water mark, even if transactions race or commit
/// out of assignment order.
pub async fn bump_max_seq_id(
    tx: &mut Transaction<'_, Postgres>,
    session_id: &str,
    new_seq: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query!(
        r#"UPDATE sessions SET max_seq_id = $2 WHERE session_id = $1 AND max_seq_id < $2"#,
        session_id,
        new_seq,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Batch "last message per session" via `DISTINCT ON`, avoiding an N+1
/// query per session in `session_list`.
pub async fn last_messages_per_session(
    pool: &PgPool,
    session_ids: &[String],
) -> Result<Vec<(String, PushFrame)>, sqlx::Error> {
    let rows = sqlx::query!(
        r#"
        SELECT DISTINCT ON (session_id)
            session_id, msg_id, seq_id, sender_username, content, msg_type, created_at
        FROM message_content
        WHERE session_id = ANY($1)
        ORDER BY session_id, seq_id DESC
        "#,
        session_ids,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            (
                row.session_id.clone(),
                PushFrame {
                    msg_id: row.msg_id,
                    seq_id: row.seq_id,
                    session_id: row.session_id,
                    from_username: row.sender_username,
                    content: row.content,
                    msg_type: row.msg_type,
                    timestamp: row.created_at.timestamp_millis(),
                },
            )
        })
        .collect())
}

pub async fn session_list(
    pool: &PgPool,
    username: &str,
) -> Result<Vec<SessionInfo>, sqlx::Error> {
    let rows = sqlx::query!(
        r#"
        SELECT s.session_id, s.name, s.session_type, s.max_seq_id, m.last_read_seq
        FROM sessions s
        JOIN session_members m ON m.session_id = s.session_id
        WHERE m.username = $1
        "#,
        username,
    )
    .fetch_all(pool)
    .await?;

    let session_ids: Vec<String> = rows.iter().map(|r| r.session_id.clone()).collect();
    let last_messages = last_messages_per_session(pool, &session_ids).await?;
    let last_message_by_session: std::collections::HashMap<String, PushFrame> =
        last_messages.into_iter().collect();

    Ok(rows
        .into_iter()
        .map(|row| SessionInfo {
            unread_count: row.max_seq_id - row.last_read_seq,
            last_read_seq: row.last_read_seq,
            last_message: last_message_by_session.get(&row.session_id).cloned(),
            session_id: row.session_id,
            name: row.name,
            session_type: row.session_type,
        })
        .collect())
}
