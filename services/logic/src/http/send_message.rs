use axum::extract::State;
use axum::Json;
use resonance_wire::{error_codes, SendMessageRequest, SendMessageResponse};

use crate::errors::LogicError;
use crate::ingest;
use crate::repo;
use crate::state::AppState;

/// `SendMessage(from_username, session_id, content, type, client_ts) ->
/// {msg_id, seq_id, error}`. Errors are carried inline
/// in the response body rather than as an HTTP failure status, since the
/// wire contract defines `error` as part of the response shape the edge
/// relays straight into an `AckFrame`.
pub async fn handler(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Json<SendMessageResponse> {
    match authorize_and_send(&state, &request).await {
        Ok((msg_id, seq_id)) => Json(SendMessageResponse {
            msg_id: Some(msg_id),
            seq_id: Some(seq_id),
            error: None,
        }),
        Err(err) => {
            tracing::warn!(error = %err, from = %request.from_username, session_id = %request.session_id, "send_message failed");
            Json(SendMessageResponse {
                msg_id: None,
                seq_id: None,
                error: Some(error_code(&err).to_owned()),
            })
        }
    }
}

async fn authorize_and_send(
    state: &AppState,
    request: &SendMessageRequest,
) -> Result<(i64, i64), LogicError> {
    let members = repo::sessions::load_members(&state.pool, &request.session_id).await?;
    if members.is_empty() {
        return Err(LogicError::SessionNotFound(request.session_id.clone()));
    }
    if !repo::sessions::is_member(&members, &request.from_username) {
        return Err(LogicError::NotAMember(request.from_username.clone()));
    }

    ingest::assign_and_persist(
        state,
        &request.session_id,
        &request.from_username,
        &request.content,
        &request.msg_type,
    )
    .await
}

fn error_code(err: &LogicError) -> &'static str {
    match err {
        LogicError::NotAMember(_) => error_codes::NOT_A_MEMBER,
        LogicError::SessionNotFound(_) => error_codes::NOT_FOUND,
        LogicError::ServerBusy(_) => error_codes::SERVER_BUSY,
        LogicError::FailedToSave(_) | LogicError::Database(_) => error_codes::FAILED_TO_SAVE,
        LogicError::StaleBatch { .. } => error_codes::MALFORMED_FRAME,
        LogicError::IdGeneration(_) => error_codes::SERVER_ERROR,
    }
}
