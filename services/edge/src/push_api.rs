use axum::extract::State;
use axum::Json;
use resonance_wire::{PushMessageRequest, PushMessageResponse};

use crate::state::AppState;

/// `PushMessage(push_envelope) -> {delivered}`, called by
/// the dispatcher. A connection that has since dropped but not yet expired
/// from the registry is the same "stale but not yet evicted" case the
/// presence store already has to tolerate -- this just returns
/// `delivered: false` rather than treating it as an error.
pub async fn handler(
    State(state): State<AppState>,
    Json(request): Json<PushMessageRequest>,
) -> Json<PushMessageResponse> {
    let delivered = match state.lookup(&request.recipient_username).await {
        Some(handle) => handle.sender.send(request.envelope).await.is_ok(),
        None => false,
    };
    Json(PushMessageResponse { delivered })
}
