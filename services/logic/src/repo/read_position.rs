use sqlx::PgPool;

/// `SET last_read_seq = ? WHERE last_read_seq < ?` -- monotonic, never regresses.
pub async fn update_read_position(
    pool: &PgPool,
    session_id: &str,
    username: &str,
    seq_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query!(
        r#"
        UPDATE session_members
        SET last_read_seq = $3
        WHERE session_id = $1 AND username = $2 AND last_read_seq < $3
        "#,
        session_id,
        username,
        seq_id,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn unread_count(
    pool: &PgPool,
    session_id: &str,
    username: &str,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query!(
        r#"
        SELECT s.max_seq_id - m.last_read_seq AS "unread!"
        FROM sessions s
        JOIN session_members m ON m.session_id = s.session_id
        WHERE s.session_id = $1 AND m.username = $2
        "#,
        session_id,
        username,
    )
    .fetch_one(pool)
    .await?;
    Ok(row.unread)
}
