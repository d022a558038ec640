use std::collections::HashMap;

use resonance_wire::PushEvent;

use crate::errors::LogicError;
use crate::repo;
use crate::state::AppState;

pub const PUSH_TOPIC: &str = "push-event";

/// The single writer of `MessageContent`/`MessageOutbox`, shared by both
/// `SendMessage` and `inject_system_message` so a
/// synthetic system message and a user's chat go through the identical
/// id-assignment, persistence, and look-aside-publish path.
pub async fn assign_and_persist(
    state: &AppState,
    session_id: &str,
    sender_username: &str,
    content: &str,
    msg_type: &str,
) -> Result<(i64, i64), LogicError> {
    let msg_id = state.idgen.next_id()?;

    let floor = repo::sessions::max_seq_id(&state.pool, session_id)
        .await?
        .unwrap_or(0);
    let seq_id = state
        .presence
        .next_seq_id(session_id, floor)
        .await
        .map_err(LogicError::ServerBusy)?;

    let mut tx = state.pool.begin().await.map_err(LogicError::FailedToSave)?;

    let created_at = repo::messages::insert_message_content(
        &mut tx,
        msg_id,
        session_id,
        sender_username,
        seq_id,
        content,
        msg_type,
    )
    .await
    .map_err(LogicError::FailedToSave)?;

    repo::sessions::bump_max_seq_id(&mut tx, session_id, seq_id)
        .await
        .map_err(LogicError::FailedToSave)?;

    let event = PushEvent {
        msg_id,
        seq_id,
        session_id: session_id.to_owned(),
        from_username: sender_username.to_owned(),
        content: content.to_owned(),
        msg_type: msg_type.to_owned(),
        timestamp: created_at.timestamp_millis(),
        trace_context: HashMap::new(),
    };
    let payload = serde_json::to_value(&event).expect("PushEvent always serializes");
    let outbox_id = repo::outbox::insert_pending(&mut tx, msg_id, PUSH_TOPIC, &payload)
        .await
        .map_err(LogicError::FailedToSave)?;

    tx.commit().await.map_err(LogicError::FailedToSave)?;

    crate::bus::publish_lookaside(state.clone(), event, outbox_id);

    Ok((msg_id, seq_id))
}
