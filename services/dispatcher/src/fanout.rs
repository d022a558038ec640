use resonance_wire::PushEvent;

use crate::errors::DispatcherError;
use crate::presence_resolve;
use crate::repo;
use crate::state::AppState;

/// One push event through the dispatcher algorithm:
/// resolve recipients, write the durable inbox fanout, resolve presence,
/// group by edge, push to each edge. Steps 1-2 are the durable delivery
/// commitment; steps 3-5 are best-effort low-latency delivery on top of it.
pub async fn handle_event(state: &AppState, event: PushEvent) {
    if let Err(err) = try_handle_event(state, event).await {
        tracing::error!(%err, "fanout step failed");
    }
}

async fn try_handle_event(state: &AppState, event: PushEvent) -> Result<(), DispatcherError> {
    let recipients =
        repo::members::recipients(&state.pool, &event.session_id, &event.from_username).await?;
    if recipients.is_empty() {
        return Ok(());
    }

    repo::inbox::write_fanout(
        &state.pool,
        &recipients,
        &event.session_id,
        event.msg_id,
        event.seq_id,
    )
    .await?;

    let by_edge = presence_resolve::group_by_edge(&state.presence, &recipients).await?;
    let envelope = resonance_wire::PushFrame::from(event);

    for (edge_id, usernames) in by_edge {
        for username in usernames {
            let delivered = state.edges.push(&edge_id, &username, &envelope).await;
            if !delivered {
                tracing::debug!(edge_id, username, msg_id = envelope.msg_id, "push not delivered; recipient will catch up via inbox-delta");
            }
        }
    }
    Ok(())
}
