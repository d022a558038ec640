// Group chat with one offline member: the online member gets pushed
// immediately, the offline one only gets a durable inbox row she later pulls
// via PullInboxDelta.

#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use resonance_bus::BusPublisher;
use resonance_presence::PresenceStore;
use resonance_test_support::MockWsClient;
use resonance_wire::{ChatFrame, Envelope, Payload, PullInboxDeltaRequest};

#[tokio::test]
async fn offline_member_gets_inbox_row_not_a_push() {
    let db = common::start_postgres().await;
    for user in ["alice", "bob", "carol"] {
        common::seed_user(&db.pool, user).await;
    }
    common::seed_session(
        &db.pool,
        "group:g1",
        "group",
        "alice",
        &[("alice", 0), ("bob", 0), ("carol", 0)],
    )
    .await;
    common::issue_token(&db.pool, "alice", "token-alice").await;
    common::issue_token(&db.pool, "bob", "token-bob").await;

    let (bus, mut bus_rx) = common::in_memory_bus();
    let presence = common::shared_presence();

    let (_logic_state, logic_url) = common::spawn_logic(
        db.pool.clone(),
        bus.clone() as Arc<dyn BusPublisher>,
        presence.clone() as Arc<dyn PresenceStore>,
        2,
    )
    .await;
    let (_edge_state, ws_url, push_base_url) =
        common::spawn_edge(db.pool.clone(), logic_url.clone(), "edge-1".to_owned()).await;

    let mut alice = MockWsClient::connect_with_token(&ws_url, "token-alice")
        .await
        .expect("alice connects");
    let mut bob = MockWsClient::connect_with_token(&ws_url, "token-bob")
        .await
        .expect("bob connects");
    // carol never connects -- she stays offline for the whole test.

    tokio::time::sleep(Duration::from_secs(3)).await;

    alice
        .send(&Envelope {
            seq: "c1".to_owned(),
            payload: Payload::Chat(ChatFrame {
                session_id: "group:g1".to_owned(),
                content: "team msg".to_owned(),
                msg_type: "text".to_owned(),
                client_ts: 1_700_000_001,
            }),
        })
        .await
        .expect("send chat frame");
    let _ack = alice.recv().await.expect("ack frame");

    let event = tokio::time::timeout(Duration::from_secs(2), bus_rx.recv())
        .await
        .expect("event published before timeout")
        .expect("bus not closed");

    let edges = dispatcher::edge_client::EdgeClient::new(
        [("edge-1".to_owned(), push_base_url)].into_iter().collect(),
    );
    let dispatcher_state =
        dispatcher::AppState::new(db.pool.clone(), presence as Arc<dyn PresenceStore>, edges);
    dispatcher::fanout::handle_event(&dispatcher_state, event).await;

    let push = bob.recv().await.expect("bob's push frame");
    match push.payload {
        Payload::Push(frame) => assert_eq!(frame.content, "team msg"),
        other => panic!("expected a push, got {other:?}"),
    }

    let carol_inbox_rows: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM inbox WHERE owner_username = 'carol' AND session_id = 'group:g1'",
    )
    .fetch_one(&db.pool)
    .await
    .expect("count carol's inbox rows");
    assert_eq!(carol_inbox_rows, 1);

    let http = reqwest::Client::new();
    let response: resonance_wire::PullInboxDeltaResponse = http
        .post(format!("{logic_url}/internal/v1/inbox-delta"))
        .json(&PullInboxDeltaRequest {
            username: "carol".to_owned(),
            cursor_id: 0,
            limit: 10,
        })
        .send()
        .await
        .expect("inbox-delta request")
        .json()
        .await
        .expect("inbox-delta response");

    assert_eq!(response.events.len(), 1);
    assert_eq!(response.events[0].message.content, "team msg");
    assert!(!response.has_more);
}
