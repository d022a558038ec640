use std::time::Duration;

use resonance_wire::PushEvent;

use crate::repo;
use crate::state::AppState;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

/// Publish on a detached task rather than inline in the request future, so a
/// client disconnecting mid-`SendMessage` doesn't cancel the publish.
/// Durability doesn't depend on this succeeding -- the outbox row is already
/// committed -- this only shaves latency off the common case where the bus
/// is healthy.
pub fn publish_lookaside(state: AppState, event: PushEvent, outbox_id: i64) {
    tokio::spawn(async move {
        match tokio::time::timeout(PUBLISH_TIMEOUT, state.bus.publish(&event)).await {
            Ok(Ok(())) => {
                if let Err(err) = repo::outbox::mark_sent(&state.pool, outbox_id).await {
                    tracing::error!(%err, outbox_id, "failed to mark outbox row sent after publish");
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, outbox_id, "look-aside publish failed; outbox relay will retry");
            }
            Err(_) => {
                tracing::warn!(outbox_id, "look-aside publish timed out; outbox relay will retry");
            }
        }
    });
}
