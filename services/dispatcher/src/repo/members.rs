use sqlx::PgPool;

use crate::errors::DispatcherError;

/// Every member of the session except the sender:
/// one recipient for a single chat, all other members for a group.
pub async fn recipients(
    pool: &PgPool,
    session_id: &str,
    sender_username: &str,
) -> Result<Vec<String>, DispatcherError> {
    let rows = sqlx::query!(
        r#"SELECT username FROM session_members WHERE session_id = $1 AND username <> $2"#,
        session_id,
        sender_username,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.username).collect())
}
