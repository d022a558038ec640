// A recipient who was offline through a run of new messages reconnects and
// pulls exactly the gap via PullInboxDelta, in ascending seq_id order.

#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use resonance_bus::BusPublisher;
use resonance_presence::PresenceStore;
use resonance_wire::{PullInboxDeltaRequest, SendMessageRequest};

#[tokio::test]
async fn reconnecting_recipient_pulls_the_gap() {
    let db = common::start_postgres().await;
    common::seed_user(&db.pool, "x").await;
    common::seed_user(&db.pool, "y").await;
    common::seed_session(&db.pool, "single:x:y", "single", "x", &[("x", 0), ("y", 80)]).await;

    // 100 prior messages, of which y has already read the first 80.
    for seq in 1..=100i64 {
        sqlx::query(
            "INSERT INTO message_content (msg_id, session_id, sender_username, seq_id, content, msg_type) \
             VALUES ($1, 'single:x:y', 'x', $1, $2, 'text')",
        )
        .bind(seq)
        .bind(format!("old message {seq}"))
        .execute(&db.pool)
        .await
        .expect("seed message_content");

        sqlx::query(
            "INSERT INTO inbox (owner_username, session_id, msg_id, seq_id) VALUES ('y', 'single:x:y', $1, $1)",
        )
        .bind(seq)
        .execute(&db.pool)
        .await
        .expect("seed inbox row");
    }
    sqlx::query("UPDATE sessions SET max_seq_id = 100 WHERE session_id = 'single:x:y'")
        .execute(&db.pool)
        .await
        .expect("seed max_seq_id");

    let last_seen_inbox_id: i64 =
        sqlx::query_scalar("SELECT max(id) FROM inbox WHERE owner_username = 'y'")
            .fetch_one(&db.pool)
            .await
            .expect("last seen inbox id");
    assert_eq!(last_seen_inbox_id, 100);

    let (bus, mut bus_rx) = common::in_memory_bus();
    let presence = common::shared_presence();

    let (_logic_state, logic_url) = common::spawn_logic(
        db.pool.clone(),
        bus.clone() as Arc<dyn BusPublisher>,
        presence.clone() as Arc<dyn PresenceStore>,
        3,
    )
    .await;

    let http = reqwest::Client::new();
    let edges = dispatcher::edge_client::EdgeClient::new(std::collections::HashMap::new());
    let dispatcher_state = dispatcher::AppState::new(
        db.pool.clone(),
        presence.clone() as Arc<dyn PresenceStore>,
        edges,
    );

    for i in 0..20 {
        let response: resonance_wire::SendMessageResponse = http
            .post(format!("{logic_url}/internal/v1/send-message"))
            .json(&SendMessageRequest {
                from_username: "x".to_owned(),
                session_id: "single:x:y".to_owned(),
                content: format!("new message {i}"),
                msg_type: "text".to_owned(),
                client_ts: 1_700_000_100 + i,
            })
            .send()
            .await
            .expect("send-message request")
            .json()
            .await
            .expect("send-message response");
        assert!(response.error.is_none());
        assert_eq!(response.seq_id, Some(101 + i));

        let event = tokio::time::timeout(Duration::from_secs(2), bus_rx.recv())
            .await
            .expect("event published before timeout")
            .expect("bus not closed");
        dispatcher::fanout::handle_event(&dispatcher_state, event).await;
    }

    let delta: resonance_wire::PullInboxDeltaResponse = http
        .post(format!("{logic_url}/internal/v1/inbox-delta"))
        .json(&PullInboxDeltaRequest {
            username: "y".to_owned(),
            cursor_id: last_seen_inbox_id,
            limit: 50,
        })
        .send()
        .await
        .expect("inbox-delta request")
        .json()
        .await
        .expect("inbox-delta response");

    assert_eq!(delta.events.len(), 20);
    assert!(!delta.has_more);
    let seq_ids: Vec<i64> = delta.events.iter().map(|e| e.message.seq_id).collect();
    let expected: Vec<i64> = (81..=100).collect();
    assert_eq!(seq_ids, expected);
    assert_eq!(delta.next_cursor_id, delta.events.last().unwrap().inbox_id);
}
