// The outbox relay must eventually deliver a message whose look-aside
// publish (and its first relay attempt) both failed, proving durability
// doesn't depend on the fast path succeeding.

#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use resonance_bus::BusPublisher;
use resonance_presence::PresenceStore;
use resonance_wire::SendMessageRequest;

#[tokio::test]
async fn relay_recovers_after_transient_publish_failures() {
    let db = common::start_postgres().await;
    common::seed_user(&db.pool, "alice").await;
    common::seed_user(&db.pool, "bob").await;
    common::seed_session(&db.pool, "single:alice:bob", "single", "alice", &[("alice", 0), ("bob", 0)]).await;

    let (inner_bus, mut bus_rx) = common::in_memory_bus();
    // Fails the look-aside publish and the first relay-tick retry, then
    // succeeds on the relay's next attempt.
    let flaky_bus: Arc<dyn BusPublisher> = Arc::new(common::FlakyBus::new(inner_bus, 2));
    let presence = common::shared_presence();

    let (_logic_state, logic_url) = common::spawn_logic(
        db.pool.clone(),
        flaky_bus,
        presence as Arc<dyn PresenceStore>,
        5,
    )
    .await;

    let http = reqwest::Client::new();
    let response: resonance_wire::SendMessageResponse = http
        .post(format!("{logic_url}/internal/v1/send-message"))
        .json(&SendMessageRequest {
            from_username: "alice".to_owned(),
            session_id: "single:alice:bob".to_owned(),
            content: "will it survive".to_owned(),
            msg_type: "text".to_owned(),
            client_ts: 1_700_000_300,
        })
        .send()
        .await
        .expect("send-message request")
        .json()
        .await
        .expect("send-message response");
    assert!(response.error.is_none());
    let msg_id = response.msg_id.expect("msg_id");

    let event = tokio::time::timeout(Duration::from_secs(10), bus_rx.recv())
        .await
        .expect("event eventually published despite transient failures")
        .expect("bus not closed");
    assert_eq!(event.msg_id, msg_id);

    // Give the relay's own `mark_sent` a moment to land after the publish
    // the assertion above observed.
    let mut status = String::new();
    for _ in 0..20 {
        status = sqlx::query_scalar("SELECT status FROM message_outbox WHERE msg_id = $1")
            .bind(msg_id)
            .fetch_one(&db.pool)
            .await
            .expect("outbox row status");
        if status == "sent" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    assert_eq!(status, "sent");

    let retry_count: i32 = sqlx::query_scalar("SELECT retry_count FROM message_outbox WHERE msg_id = $1")
        .bind(msg_id)
        .fetch_one(&db.pool)
        .await
        .expect("retry_count");
    assert!(retry_count >= 1, "expected at least one recorded retry before success");
}
