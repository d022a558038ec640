use crate::errors::LogicError;
use crate::ingest;
use crate::state::AppState;

/// Reserved sender identity for synthetic messages; cannot authenticate as a
/// real user, so it can never be impersonated by a client.
pub const SYSTEM_SENDER: &str = "system";

/// Injects a system message (e.g. "alice created this group") through the
/// same id-assignment and outbox path `SendMessage` uses. Session creation
/// itself is out of scope; this is the one hook it needs from this crate.
pub async fn inject_system_message(
    state: &AppState,
    session_id: &str,
    content: &str,
) -> Result<(i64, i64), LogicError> {
    ingest::assign_and_persist(state, session_id, SYSTEM_SENDER, content, "system").await
}
