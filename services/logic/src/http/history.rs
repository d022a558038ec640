use axum::extract::State;
use axum::Json;
use resonance_wire::{GetRecentMessagesRequest, GetRecentMessagesResponse};

use crate::errors::LogicError;
use crate::repo;
use crate::state::AppState;

/// `GetRecentMessages(session_id, before_seq, limit) -> [PushFrame]`, newest
/// page below `before_seq` returned oldest-first.
pub async fn handler(
    State(state): State<AppState>,
    Json(request): Json<GetRecentMessagesRequest>,
) -> Result<Json<GetRecentMessagesResponse>, LogicError> {
    let messages = repo::messages::recent_messages(
        &state.pool,
        &request.session_id,
        request.before_seq,
        request.limit,
    )
    .await?;
    Ok(Json(GetRecentMessagesResponse { messages }))
}
