// Many concurrent SendMessage calls against the same session must each get
// a distinct seq_id, covering every integer from 1..=N with no gaps or
// duplicates, regardless of commit order.

#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;

use resonance_bus::BusPublisher;
use resonance_presence::PresenceStore;
use resonance_wire::SendMessageRequest;

const CONCURRENT_SENDS: i64 = 50;

#[tokio::test]
async fn concurrent_sends_get_distinct_contiguous_seq_ids() {
    let db = common::start_postgres().await;
    common::seed_user(&db.pool, "alice").await;
    common::seed_user(&db.pool, "bob").await;
    common::seed_session(&db.pool, "single:alice:bob", "single", "alice", &[("alice", 0), ("bob", 0)]).await;

    let (bus, _bus_rx) = common::in_memory_bus();
    let presence = common::shared_presence();
    let (_logic_state, logic_url) = common::spawn_logic(
        db.pool.clone(),
        bus as Arc<dyn BusPublisher>,
        presence as Arc<dyn PresenceStore>,
        4,
    )
    .await;

    let http = reqwest::Client::new();
    let mut tasks = Vec::new();
    for i in 0..CONCURRENT_SENDS {
        let http = http.clone();
        let logic_url = logic_url.clone();
        tasks.push(tokio::spawn(async move {
            let response: resonance_wire::SendMessageResponse = http
                .post(format!("{logic_url}/internal/v1/send-message"))
                .json(&SendMessageRequest {
                    from_username: "alice".to_owned(),
                    session_id: "single:alice:bob".to_owned(),
                    content: format!("msg {i}"),
                    msg_type: "text".to_owned(),
                    client_ts: 1_700_000_200 + i,
                })
                .send()
                .await
                .expect("send-message request")
                .json()
                .await
                .expect("send-message response");
            response.seq_id.expect("seq_id assigned")
        }));
    }

    let mut seq_ids = Vec::with_capacity(tasks.len());
    for task in tasks {
        seq_ids.push(task.await.expect("task did not panic"));
    }
    seq_ids.sort_unstable();

    let expected: Vec<i64> = (1..=CONCURRENT_SENDS).collect();
    assert_eq!(seq_ids, expected);

    let max_seq_id: i64 =
        sqlx::query_scalar("SELECT max_seq_id FROM sessions WHERE session_id = 'single:alice:bob'")
            .fetch_one(&db.pool)
            .await
            .expect("max_seq_id");
    assert_eq!(max_seq_id, CONCURRENT_SENDS);

    let message_count: i64 =
        sqlx::query_scalar("SELECT count(*) FROM message_content WHERE session_id = 'single:alice:bob'")
            .fetch_one(&db.pool)
            .await
            .expect("message count");
    assert_eq!(message_count, CONCURRENT_SENDS);
}
