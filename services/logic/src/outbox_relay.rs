use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use resonance_wire::PushEvent;

use crate::repo;
use crate::state::AppState;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const BATCH_SIZE: i64 = 100;
const MAX_RETRIES: i32 = 20;
const ADVISORY_LOCK_KEY: &str = "resonance-outbox-relay";

/// Spawn the relay as a background task colocated with the Logic HTTP
/// server -- not a separate binary.
pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(err) = tick(&state).await {
                tracing::error!(%err, "outbox relay tick failed");
            }
        }
    });
}

/// One relay tick: acquire the partition's advisory lock so only one relay
/// instance scans at a time, relay a batch, release the lock.
async fn tick(state: &AppState) -> Result<(), sqlx::Error> {
    let mut conn = state.pool.acquire().await?;

    let locked: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock(hashtext($1))")
        .bind(ADVISORY_LOCK_KEY)
        .fetch_one(&mut *conn)
        .await?;
    if !locked {
        return Ok(());
    }

    let result = relay_batch(state).await;

    sqlx::query("SELECT pg_advisory_unlock(hashtext($1))")
        .bind(ADVISORY_LOCK_KEY)
        .execute(&mut *conn)
        .await?;

    result
}

async fn relay_batch(state: &AppState) -> Result<(), sqlx::Error> {
    let rows = repo::outbox::fetch_due(&state.pool, BATCH_SIZE).await?;

    for row in rows {
        let event: PushEvent = match serde_json::from_value(row.payload.clone()) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(%err, id = row.id, "outbox row has an undecodable payload");
                continue;
            }
        };

        match state.bus.publish(&event).await {
            Ok(()) => {
                repo::outbox::mark_sent(&state.pool, row.id).await?;
            }
            Err(err) => {
                let retry_count = row.retry_count + 1;
                if retry_count > MAX_RETRIES {
                    repo::outbox::mark_failed(&state.pool, row.id).await?;
                    tracing::error!(
                        id = row.id,
                        msg_id = row.msg_id,
                        retry_count,
                        "ALERT: outbox row exceeded retry budget and was marked failed"
                    );
                } else {
                    let next_retry_time = Utc::now() + backoff_with_jitter(retry_count);
                    repo::outbox::mark_retry(&state.pool, row.id, next_retry_time, retry_count)
                        .await?;
                    tracing::warn!(%err, id = row.id, retry_count, "outbox publish failed, scheduled retry");
                }
            }
        }
    }

    Ok(())
}

/// Exponential backoff (1s -> 2s -> 4s -> ... ), capped at 5 minutes, with up
/// to 25% jitter to avoid synchronized retry storms across many rows.
fn backoff_with_jitter(retry_count: i32) -> chrono::Duration {
    const CAP_MS: i64 = 5 * 60 * 1000;
    let base_ms = 1000i64.saturating_mul(1i64 << retry_count.clamp(0, 20).min(12));
    let capped_ms = base_ms.min(CAP_MS);
    let jitter_ms = if capped_ms > 0 {
        rand::thread_rng().gen_range(0..=capped_ms / 4)
    } else {
        0
    };
    chrono::Duration::milliseconds(capped_ms + jitter_ms)
}
