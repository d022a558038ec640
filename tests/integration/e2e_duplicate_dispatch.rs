// Redelivering the same bus event through the dispatcher twice (simulating
// an at-least-once redelivery after a crash mid-fanout) must not duplicate
// the durable inbox row, even though the best-effort push itself fires
// again.

#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use resonance_bus::BusPublisher;
use resonance_presence::PresenceStore;
use resonance_test_support::MockPushServer;
use resonance_wire::SendMessageRequest;

#[tokio::test]
async fn redelivered_event_does_not_duplicate_inbox_row() {
    let db = common::start_postgres().await;
    common::seed_user(&db.pool, "alice").await;
    common::seed_user(&db.pool, "bob").await;
    common::seed_session(&db.pool, "single:alice:bob", "single", "alice", &[("alice", 0), ("bob", 0)]).await;

    let (bus, mut bus_rx) = common::in_memory_bus();
    let presence = common::shared_presence();
    presence
        .set_online("bob", "edge-1", Duration::from_secs(300))
        .await
        .expect("mark bob online");

    let (_logic_state, logic_url) = common::spawn_logic(
        db.pool.clone(),
        bus as Arc<dyn BusPublisher>,
        presence.clone() as Arc<dyn PresenceStore>,
        6,
    )
    .await;

    let http = reqwest::Client::new();
    let response: resonance_wire::SendMessageResponse = http
        .post(format!("{logic_url}/internal/v1/send-message"))
        .json(&SendMessageRequest {
            from_username: "alice".to_owned(),
            session_id: "single:alice:bob".to_owned(),
            content: "redeliver me".to_owned(),
            msg_type: "text".to_owned(),
            client_ts: 1_700_000_400,
        })
        .send()
        .await
        .expect("send-message request")
        .json()
        .await
        .expect("send-message response");
    assert!(response.error.is_none());

    let event = tokio::time::timeout(Duration::from_secs(2), bus_rx.recv())
        .await
        .expect("event published before timeout")
        .expect("bus not closed");

    let mock_edge = MockPushServer::start().await.expect("start mock edge");
    let edges = dispatcher::edge_client::EdgeClient::new(
        [("edge-1".to_owned(), format!("http://{}", mock_edge.local_addr()))]
            .into_iter()
            .collect(),
    );
    let dispatcher_state =
        dispatcher::AppState::new(db.pool.clone(), presence as Arc<dyn PresenceStore>, edges);

    dispatcher::fanout::handle_event(&dispatcher_state, event.clone()).await;
    dispatcher::fanout::handle_event(&dispatcher_state, event).await;

    let inbox_rows: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM inbox WHERE owner_username = 'bob' AND session_id = 'single:alice:bob'",
    )
    .fetch_one(&db.pool)
    .await
    .expect("count bob's inbox rows");
    assert_eq!(inbox_rows, 1, "redelivery must not duplicate the inbox row");

    // The push step has no idempotency guard -- both deliveries reach the edge.
    assert_eq!(mock_edge.received().len(), 2);
}
