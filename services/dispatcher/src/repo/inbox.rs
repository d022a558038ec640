use sqlx::PgPool;

use crate::errors::DispatcherError;

/// Batch-insert one `Inbox` row per recipient in a single round trip via
/// `UNNEST`, with `ON CONFLICT ... DO NOTHING` on the unique
/// `(owner_username, session_id, seq_id)` key -- this is the idempotency
/// boundary: redelivering the same event inserts nothing the second time.
pub async fn write_fanout(
    pool: &PgPool,
    recipients: &[String],
    session_id: &str,
    msg_id: i64,
    seq_id: i64,
) -> Result<(), DispatcherError> {
    if recipients.is_empty() {
        return Ok(());
    }

    let owners = recipients.to_vec();
    let session_ids = vec![session_id.to_owned(); recipients.len()];
    let msg_ids = vec![msg_id; recipients.len()];
    let seq_ids = vec![seq_id; recipients.len()];

    sqlx::query(
        r#"
        INSERT INTO inbox (owner_username, session_id, msg_id, seq_id)
        SELECT * FROM UNNEST($1::text[], $2::text[], $3::bigint[], $4::bigint[])
        ON CONFLICT (owner_username, session_id, seq_id) DO NOTHING
        "#,
    )
    .bind(owners)
    .bind(session_ids)
    .bind(msg_ids)
    .bind(seq_ids)
    .execute(pool)
    .await?;

    Ok(())
}
