use axum::extract::State;
use axum::Json;
use resonance_wire::{UpdateReadPositionRequest, UpdateReadPositionResponse};

use crate::errors::LogicError;
use crate::repo;
use crate::state::AppState;

/// `UpdateReadPosition(session_id, username, seq_id) -> {unread_count}`.
/// The CAS update never regresses `last_read_seq`, so replaying an older ack
/// after a newer one already landed is a harmless no-op.
pub async fn handler(
    State(state): State<AppState>,
    Json(request): Json<UpdateReadPositionRequest>,
) -> Result<Json<UpdateReadPositionResponse>, LogicError> {
    repo::read_position::update_read_position(
        &state.pool,
        &request.session_id,
        &request.username,
        request.seq_id,
    )
    .await?;
    let unread_count =
        repo::read_position::unread_count(&state.pool, &request.session_id, &request.username)
            .await?;
    Ok(Json(UpdateReadPositionResponse { unread_count }))
}
