use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::LogicError;
use crate::repo;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub username: String,
}

/// `GetSessionList(username) -> [SessionInfo]`, unread counts and last
/// message attached per session via a single `DISTINCT ON` join
///, not one query per session.
pub async fn handler(
    State(state): State<AppState>,
    Query(query): Query<SessionListQuery>,
) -> Result<Json<resonance_wire::GetSessionListResponse>, LogicError> {
    let sessions = repo::sessions::session_list(&state.pool, &query.username).await?;
    Ok(Json(resonance_wire::GetSessionListResponse { sessions }))
}
