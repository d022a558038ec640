// Full pipeline happy path: one sender, one recipient, both connected to the
// same edge. Exercises Client -> Edge -> Logic -> bus -> Dispatcher -> Edge
// -> Client end to end.

#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use resonance_bus::BusPublisher;
use resonance_presence::PresenceStore;
use resonance_test_support::MockWsClient;
use resonance_wire::{ChatFrame, Envelope, Payload};

#[tokio::test]
async fn alice_sends_bob_receives() {
    let db = common::start_postgres().await;
    common::seed_user(&db.pool, "alice").await;
    common::seed_user(&db.pool, "bob").await;
    common::seed_session(&db.pool, "single:alice:bob", "single", "alice", &[("alice", 0), ("bob", 0)]).await;
    common::issue_token(&db.pool, "alice", "token-alice").await;
    common::issue_token(&db.pool, "bob", "token-bob").await;

    let (bus, mut bus_rx) = common::in_memory_bus();
    let presence = common::shared_presence();

    let (_logic_state, logic_url) = common::spawn_logic(
        db.pool.clone(),
        bus.clone() as Arc<dyn BusPublisher>,
        presence.clone() as Arc<dyn PresenceStore>,
        1,
    )
    .await;
    let (_edge_state, ws_url, push_base_url) =
        common::spawn_edge(db.pool.clone(), logic_url, "edge-1".to_owned()).await;

    let mut alice = MockWsClient::connect_with_token(&ws_url, "token-alice")
        .await
        .expect("alice connects");
    let mut bob = MockWsClient::connect_with_token(&ws_url, "token-bob")
        .await
        .expect("bob connects");

    // Let the presence batcher's periodic flush land bob's online status.
    tokio::time::sleep(Duration::from_secs(3)).await;

    alice
        .send(&Envelope {
            seq: "c1".to_owned(),
            payload: Payload::Chat(ChatFrame {
                session_id: "single:alice:bob".to_owned(),
                content: "hi bob".to_owned(),
                msg_type: "text".to_owned(),
                client_ts: 1_700_000_000,
            }),
        })
        .await
        .expect("send chat frame");

    let ack = alice.recv().await.expect("ack frame");
    let (msg_id, seq_id) = match ack.payload {
        Payload::Ack(frame) => {
            assert_eq!(frame.ref_seq, "c1");
            assert!(frame.error.is_none());
            (frame.msg_id.expect("msg_id"), frame.seq_id.expect("seq_id"))
        }
        other => panic!("expected an ack, got {other:?}"),
    };
    assert_eq!(seq_id, 1);

    let event = tokio::time::timeout(Duration::from_secs(2), bus_rx.recv())
        .await
        .expect("event published before timeout")
        .expect("bus not closed");
    assert_eq!(event.msg_id, msg_id);

    let edges = dispatcher::edge_client::EdgeClient::new(
        [("edge-1".to_owned(), push_base_url)].into_iter().collect(),
    );
    let dispatcher_state =
        dispatcher::AppState::new(db.pool.clone(), presence as Arc<dyn PresenceStore>, edges);
    dispatcher::fanout::handle_event(&dispatcher_state, event).await;

    let push = bob.recv().await.expect("push frame");
    match push.payload {
        Payload::Push(frame) => {
            assert_eq!(frame.content, "hi bob");
            assert_eq!(frame.from_username, "alice");
            assert_eq!(frame.msg_id, msg_id);
        }
        other => panic!("expected a push, got {other:?}"),
    }

    let inbox_rows: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM inbox WHERE owner_username = 'bob' AND session_id = 'single:alice:bob'",
    )
    .fetch_one(&db.pool)
    .await
    .expect("count bob's inbox rows");
    assert_eq!(inbox_rows, 1);
}
