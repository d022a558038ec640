use axum::extract::State;
use axum::Json;
use resonance_wire::{PullInboxDeltaRequest, PullInboxDeltaResponse};

use crate::errors::LogicError;
use crate::repo;
use crate::state::AppState;

/// `PullInboxDelta(username, cursor_id, limit) -> {events, next_cursor_id, has_more}`.
/// `next_cursor_id` is the last returned event's `inbox_id`, or the request's
/// own `cursor_id` unchanged when nothing new was found.
pub async fn handler(
    State(state): State<AppState>,
    Json(request): Json<PullInboxDeltaRequest>,
) -> Result<Json<PullInboxDeltaResponse>, LogicError> {
    let (events, has_more) = repo::inbox::fetch_delta(
        &state.pool,
        &request.username,
        request.cursor_id,
        request.limit,
    )
    .await?;

    let next_cursor_id = events
        .last()
        .map(|event| event.inbox_id)
        .unwrap_or(request.cursor_id);

    Ok(Json(PullInboxDeltaResponse {
        events,
        next_cursor_id,
        has_more,
    }))
}
