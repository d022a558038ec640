use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use resonance_wire::{error_codes, HttpErrorEnvelope};

/// Validation errors are the caller's fault and carry no side effect;
/// durable/transient infrastructure errors are the caller's cue to retry;
/// invariant violations are logged and surfaced but must never corrupt state.
#[derive(Debug, thiserror::Error)]
pub enum LogicError {
    #[error("{0} is not a member of this session")]
    NotAMember(String),
    #[error("session {0} does not exist")]
    SessionNotFound(String),
    #[error("the seq_id generator is unreachable")]
    ServerBusy(#[source] resonance_presence::PresenceError),
    #[error("failed to persist message")]
    FailedToSave(#[source] sqlx::Error),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("stale sync_status batch for edge {edge_id}: seq {seq_id} <= last seen {last_seen}")]
    StaleBatch {
        edge_id: String,
        seq_id: u64,
        last_seen: u64,
    },
    #[error("msg_id generation failed")]
    IdGeneration(#[from] resonance_idgen::IdGenError),
}

impl LogicError {
    fn code(&self) -> &'static str {
        match self {
            LogicError::NotAMember(_) => error_codes::NOT_A_MEMBER,
            LogicError::SessionNotFound(_) => error_codes::NOT_FOUND,
            LogicError::ServerBusy(_) => error_codes::SERVER_BUSY,
            LogicError::FailedToSave(_) => error_codes::FAILED_TO_SAVE,
            LogicError::Database(_) => error_codes::SERVER_ERROR,
            LogicError::StaleBatch { .. } => error_codes::MALFORMED_FRAME,
            LogicError::IdGeneration(_) => error_codes::SERVER_ERROR,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            LogicError::NotAMember(_) | LogicError::StaleBatch { .. } => StatusCode::BAD_REQUEST,
            LogicError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            LogicError::ServerBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
            LogicError::FailedToSave(_) | LogicError::Database(_) | LogicError::IdGeneration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for LogicError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, code = self.code(), "logic request failed");
        let envelope = HttpErrorEnvelope {
            code: self.code().to_owned(),
            message: self.to_string(),
            details: None,
        };
        (self.status(), Json(envelope)).into_response()
    }
}
