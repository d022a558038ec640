// resonance-wire: shared wire types for the message pipeline.
//
// Three distinct encodings are in play:
//   - Client <-> Edge: `Envelope` over a WebSocket *binary* frame, `bincode`-encoded.
//     `Payload` is therefore an externally-tagged enum (bincode is not
//     self-describing, so `#[serde(tag = "...")]` internally-tagged enums
//     cannot round-trip through it).
//   - Edge <-> Logic and Dispatcher <-> Edge RPCs: plain JSON-over-HTTP request/response
//     structs, no enum wrapping needed.
//   - The bus payload (`PushEvent`): JSON, published by Logic and consumed by Dispatcher.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Client <-> Edge binary envelope
// ---------------------------------------------------------------------------

/// Every client<->edge frame is one `Envelope`. `seq` is a client-generated
/// correlation id; the edge echoes it back in the response frame (if any).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: String,
    pub payload: Payload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    /// Heartbeat. Carries no data; resets the server-side idle timer.
    Pulse,
    /// Upstream send.
    Chat(ChatFrame),
    /// Acknowledgement of a client `chat` frame, carrying the assigned ids
    /// (or an error code) back to the sender.
    Ack(AckFrame),
    /// Downstream delivery, written by the edge on behalf of the dispatcher.
    Push(PushFrame),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFrame {
    pub session_id: String,
    pub content: String,
    pub msg_type: String,
    pub client_ts: i64,
}

/// Response to a `chat` frame, or a bare ack of a `push`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckFrame {
    /// Correlates to the `seq` of the frame being acknowledged.
    pub ref_seq: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFrame {
    pub msg_id: i64,
    pub seq_id: i64,
    pub session_id: String,
    pub from_username: String,
    pub content: String,
    pub msg_type: String,
    pub timestamp: i64,
}

/// Encode an `Envelope` into the bytes carried by one WebSocket binary frame.
pub fn encode_envelope(envelope: &Envelope) -> Result<Vec<u8>, bincode::Error> {
    bincode::serialize(envelope)
}

/// Decode a WebSocket binary frame back into an `Envelope`.
pub fn decode_envelope(bytes: &[u8]) -> Result<Envelope, bincode::Error> {
    bincode::deserialize(bytes)
}

/// Frozen v1 error codes returned in `AckFrame::error` and `HttpErrorEnvelope::code`.
pub mod error_codes {
    pub const NOT_A_MEMBER: &str = "NOT_A_MEMBER";
    pub const MALFORMED_FRAME: &str = "MALFORMED_FRAME";
    pub const OVERSIZE_PAYLOAD: &str = "OVERSIZE_PAYLOAD";
    pub const SERVER_BUSY: &str = "SERVER_BUSY";
    pub const FAILED_TO_SAVE: &str = "FAILED_TO_SAVE";
    pub const SERVER_ERROR: &str = "SERVER_ERROR";
    pub const INVALID_TOKEN: &str = "INVALID_TOKEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
}

/// Frozen HTTP error envelope used by all non-2xx Edge<->Logic and admin responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorEnvelope {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Edge -> Logic RPCs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub from_username: String,
    pub session_id: String,
    pub content: String,
    pub msg_type: String,
    pub client_ts: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceDelta {
    pub username: String,
    pub remote_addr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatusRequest {
    pub edge_id: String,
    /// Monotonically increasing per edge; lets Logic reject stale/reordered batches.
    pub seq_id: u64,
    #[serde(default)]
    pub online_batch: Vec<PresenceDelta>,
    #[serde(default)]
    pub offline_batch: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatusResponse {
    pub seq_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub name: String,
    pub session_type: String,
    pub unread_count: i64,
    pub last_read_seq: i64,
    pub last_message: Option<PushFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetSessionListResponse {
    pub sessions: Vec<SessionInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetRecentMessagesRequest {
    pub session_id: String,
    pub before_seq: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetRecentMessagesResponse {
    pub messages: Vec<PushFrame>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullInboxDeltaRequest {
    pub username: String,
    pub cursor_id: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxEvent {
    pub inbox_id: i64,
    pub message: PushFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullInboxDeltaResponse {
    pub events: Vec<InboxEvent>,
    pub next_cursor_id: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateReadPositionRequest {
    pub session_id: String,
    pub username: String,
    pub seq_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateReadPositionResponse {
    pub unread_count: i64,
}

// ---------------------------------------------------------------------------
// Dispatcher -> Edge RPC
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessageRequest {
    pub recipient_username: String,
    pub envelope: PushFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessageResponse {
    pub delivered: bool,
}

// ---------------------------------------------------------------------------
// Bus payload (Logic -> Dispatcher, via resonance-bus)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    pub msg_id: i64,
    pub seq_id: i64,
    pub session_id: String,
    pub from_username: String,
    pub content: String,
    pub msg_type: String,
    pub timestamp: i64,
    /// Opaque key/value trace context for downstream observability; not
    /// interpreted by the dispatcher itself.
    #[serde(default)]
    pub trace_context: std::collections::HashMap<String, String>,
}

impl From<PushEvent> for PushFrame {
    fn from(event: PushEvent) -> Self {
        PushFrame {
            msg_id: event.msg_id,
            seq_id: event.seq_id,
            session_id: event.session_id,
            from_username: event.from_username,
            content: event.content,
            msg_type: event.msg_type,
            timestamp: event.timestamp,
        }
    }
}

/// Bus subject for a session, partitioned by `hash(session_id) % partitions`.
///
/// FIFO-per-partition NATS subjects so that one dispatcher worker observes
/// one session's events in publish order.
pub fn push_subject(session_id: &str, partitions: u32) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    session_id.hash(&mut hasher);
    let partition = (hasher.finish() % u64::from(partitions)) as u32;
    push_subject_for_partition(partition)
}

/// The literal subject for a given partition number, for the dispatcher to
/// subscribe to each partition directly without reverse-engineering one
/// from `push_subject`.
pub fn push_subject_for_partition(partition: u32) -> String {
    format!("resonance.push.{partition}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trips_through_bincode() {
        let envelope = Envelope {
            seq: "c-1".to_owned(),
            payload: Payload::Chat(ChatFrame {
                session_id: "single:alice:bob".to_owned(),
                content: "hi".to_owned(),
                msg_type: "text".to_owned(),
                client_ts: 1_700_000_000,
            }),
        };
        let bytes = encode_envelope(&envelope).expect("encode");
        let decoded = decode_envelope(&bytes).expect("decode");
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn push_subject_is_stable_for_same_session() {
        let a = push_subject("single:alice:bob", 16);
        let b = push_subject("single:alice:bob", 16);
        assert_eq!(a, b);
    }

    #[test]
    fn push_subject_is_bounded_by_partition_count() {
        for i in 0..64 {
            let subject = push_subject(&format!("session-{i}"), 8);
            let partition: u32 = subject
                .strip_prefix("resonance.push.")
                .and_then(|s| s.parse().ok())
                .expect("well-formed subject");
            assert!(partition < 8);
        }
    }

    #[test]
    fn push_event_converts_to_push_frame() {
        let event = PushEvent {
            msg_id: 42,
            seq_id: 1,
            session_id: "s1".to_owned(),
            from_username: "alice".to_owned(),
            content: "hi".to_owned(),
            msg_type: "text".to_owned(),
            timestamp: 1,
            trace_context: std::collections::HashMap::new(),
        };
        let frame: PushFrame = event.into();
        assert_eq!(frame.msg_id, 42);
        assert_eq!(frame.from_username, "alice");
    }
}
