//! Presence tracking and per-session `seq_id` assignment.
//!
//! Both live in the same external KV store (Redis in production) because
//! both need the same properties: cheap atomic updates, a TTL knob, and a
//! value that survives any one edge or logic process restarting. Presence
//! is "authoritative but stale" — a `get_batch` miss means "not known to be
//! online", not "definitely offline", since a key can expire a few seconds
//! before the owning edge actually drops the connection.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("presence store unavailable: {0}")]
    Unavailable(String),
}

/// Presence + seq-id assignment, backed by a shared external store.
///
/// Presence keys are `presence:user:{username}` holding the owning edge id,
/// with a TTL refreshed on every heartbeat batch from that edge.
/// `next_seq_id` assigns the next per-session sequence
/// number, guaranteeing it never falls below `floor` even if the counter key
/// was evicted or the store was restarted.
#[async_trait]
pub trait PresenceStore: Send + Sync {
    async fn set_online(
        &self,
        username: &str,
        edge_id: &str,
        ttl: Duration,
    ) -> Result<(), PresenceError>;

    async fn set_offline(&self, username: &str) -> Result<(), PresenceError>;

    /// Batch lookup. Usernames absent from the returned map are not known
    /// to be online anywhere.
    async fn get_batch(&self, usernames: &[String]) -> Result<HashMap<String, String>, PresenceError>;

    /// Batch `set_online`, one round trip regardless of batch size.
    async fn set_batch(&self, entries: &[(String, String)], ttl: Duration) -> Result<(), PresenceError>;

    /// Batch `set_offline`, one round trip regardless of batch size.
    async fn delete_batch(&self, usernames: &[String]) -> Result<(), PresenceError>;

    /// Atomically assign the next `seq_id` for `session_id`. If the counter
    /// has never been set (fresh key, or the store lost it), it is first
    /// initialized to `floor` before being incremented, so the value
    /// returned is always `> floor` even on a cold counter.
    async fn next_seq_id(&self, session_id: &str, floor: i64) -> Result<i64, PresenceError>;
}

const PRESENCE_KEY_PREFIX: &str = "presence:user:";
const SEQ_KEY_PREFIX: &str = "seq:session:";

fn presence_key(username: &str) -> String {
    format!("{PRESENCE_KEY_PREFIX}{username}")
}

fn seq_key(session_id: &str) -> String {
    format!("{SEQ_KEY_PREFIX}{session_id}")
}

/// Lua script: initialize the counter to `floor` only if it is absent, then
/// `INCR` it. Both steps run inside Redis's single-threaded script execution,
/// so concurrent callers never observe a half-initialized counter.
const NEXT_SEQ_SCRIPT: &str = r"
local key = KEYS[1]
local floor = tonumber(ARGV[1])
if redis.call('EXISTS', key) == 0 then
    redis.call('SET', key, floor)
end
return redis.call('INCR', key)
";

pub struct RedisPresenceStore {
    conn: redis::aio::ConnectionManager,
    script: redis::Script,
}

impl RedisPresenceStore {
    pub async fn connect(redis_url: &str) -> Result<Self, PresenceError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            script: redis::Script::new(NEXT_SEQ_SCRIPT),
        })
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn set_online(
        &self,
        username: &str,
        edge_id: &str,
        ttl: Duration,
    ) -> Result<(), PresenceError> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(presence_key(username))
            .arg(edge_id)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_offline(&self, username: &str) -> Result<(), PresenceError> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(presence_key(username))
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn get_batch(&self, usernames: &[String]) -> Result<HashMap<String, String>, PresenceError> {
        if usernames.is_empty() {
            return Ok(HashMap::new());
        }
        let mut conn = self.conn.clone();
        let keys: Vec<String> = usernames.iter().map(|u| presence_key(u)).collect();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await?;
        let mut out = HashMap::with_capacity(usernames.len());
        for (username, edge_id) in usernames.iter().zip(values) {
            if let Some(edge_id) = edge_id {
                out.insert(username.clone(), edge_id);
            }
        }
        Ok(out)
    }

    async fn next_seq_id(&self, session_id: &str, floor: i64) -> Result<i64, PresenceError> {
        let mut conn = self.conn.clone();
        let next: i64 = self
            .script
            .key(seq_key(session_id))
            .arg(floor)
            .invoke_async(&mut conn)
            .await?;
        Ok(next)
    }

    async fn set_batch(&self, entries: &[(String, String)], ttl: Duration) -> Result<(), PresenceError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for (username, edge_id) in entries {
            pipe.cmd("SET")
                .arg(presence_key(username))
                .arg(edge_id)
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .ignore();
        }
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn delete_batch(&self, usernames: &[String]) -> Result<(), PresenceError> {
        if usernames.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let keys: Vec<String> = usernames.iter().map(|u| presence_key(u)).collect();
        redis::cmd("DEL").arg(&keys).query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

/// In-memory double for tests: same monotonicity/TTL contract, no network.
pub mod test_support {
    use super::{PresenceError, PresenceStore};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    struct Entry {
        edge_id: String,
        expires_at: Instant,
    }

    #[derive(Default)]
    pub struct InMemoryPresenceStore {
        presence: Mutex<HashMap<String, Entry>>,
        counters: Mutex<HashMap<String, i64>>,
    }

    impl InMemoryPresenceStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl PresenceStore for InMemoryPresenceStore {
        async fn set_online(
            &self,
            username: &str,
            edge_id: &str,
            ttl: Duration,
        ) -> Result<(), PresenceError> {
            self.presence.lock().expect("presence mutex poisoned").insert(
                username.to_owned(),
                Entry {
                    edge_id: edge_id.to_owned(),
                    expires_at: Instant::now() + ttl,
                },
            );
            Ok(())
        }

        async fn set_offline(&self, username: &str) -> Result<(), PresenceError> {
            self.presence.lock().expect("presence mutex poisoned").remove(username);
            Ok(())
        }

        async fn get_batch(
            &self,
            usernames: &[String],
        ) -> Result<HashMap<String, String>, PresenceError> {
            let now = Instant::now();
            let presence = self.presence.lock().expect("presence mutex poisoned");
            let mut out = HashMap::with_capacity(usernames.len());
            for username in usernames {
                if let Some(entry) = presence.get(username) {
                    if entry.expires_at > now {
                        out.insert(username.clone(), entry.edge_id.clone());
                    }
                }
            }
            Ok(out)
        }

        async fn next_seq_id(&self, session_id: &str, floor: i64) -> Result<i64, PresenceError> {
            let mut counters = self.counters.lock().expect("counters mutex poisoned");
            let counter = counters.entry(session_id.to_owned()).or_insert(floor);
            *counter += 1;
            Ok(*counter)
        }

        async fn set_batch(&self, entries: &[(String, String)], ttl: Duration) -> Result<(), PresenceError> {
            let mut presence = self.presence.lock().expect("presence mutex poisoned");
            let expires_at = Instant::now() + ttl;
            for (username, edge_id) in entries {
                presence.insert(
                    username.clone(),
                    Entry {
                        edge_id: edge_id.clone(),
                        expires_at,
                    },
                );
            }
            Ok(())
        }

        async fn delete_batch(&self, usernames: &[String]) -> Result<(), PresenceError> {
            let mut presence = self.presence.lock().expect("presence mutex poisoned");
            for username in usernames {
                presence.remove(username);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::InMemoryPresenceStore;
    use super::*;

    #[tokio::test]
    async fn online_users_appear_in_batch_lookup() {
        let store = InMemoryPresenceStore::new();
        store.set_online("alice", "edge-1", Duration::from_secs(30)).await.unwrap();
        let result = store
            .get_batch(&["alice".to_owned(), "bob".to_owned()])
            .await
            .unwrap();
        assert_eq!(result.get("alice"), Some(&"edge-1".to_owned()));
        assert!(!result.contains_key("bob"));
    }

    #[tokio::test]
    async fn set_offline_removes_from_batch_lookup() {
        let store = InMemoryPresenceStore::new();
        store.set_online("alice", "edge-1", Duration::from_secs(30)).await.unwrap();
        store.set_offline("alice").await.unwrap();
        let result = store.get_batch(&["alice".to_owned()]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn expired_presence_entries_are_treated_as_offline() {
        let store = InMemoryPresenceStore::new();
        store.set_online("alice", "edge-1", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = store.get_batch(&["alice".to_owned()]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn next_seq_id_is_monotonic_and_starts_above_floor() {
        let store = InMemoryPresenceStore::new();
        let first = store.next_seq_id("session-1", 100).await.unwrap();
        let second = store.next_seq_id("session-1", 100).await.unwrap();
        assert!(first > 100);
        assert!(second > first);
    }

    #[tokio::test]
    async fn next_seq_id_floor_is_ignored_once_counter_exists() {
        let store = InMemoryPresenceStore::new();
        let first = store.next_seq_id("session-1", 100).await.unwrap();
        // A later, lower floor must not reset an already-initialized counter.
        let second = store.next_seq_id("session-1", 0).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn set_batch_records_every_entry_in_one_call() {
        let store = InMemoryPresenceStore::new();
        store
            .set_batch(
                &[
                    ("alice".to_owned(), "edge-1".to_owned()),
                    ("bob".to_owned(), "edge-2".to_owned()),
                ],
                Duration::from_secs(30),
            )
            .await
            .unwrap();
        let result = store
            .get_batch(&["alice".to_owned(), "bob".to_owned()])
            .await
            .unwrap();
        assert_eq!(result.get("alice"), Some(&"edge-1".to_owned()));
        assert_eq!(result.get("bob"), Some(&"edge-2".to_owned()));
    }

    #[tokio::test]
    async fn delete_batch_removes_every_entry_in_one_call() {
        let store = InMemoryPresenceStore::new();
        store
            .set_batch(
                &[
                    ("alice".to_owned(), "edge-1".to_owned()),
                    ("bob".to_owned(), "edge-2".to_owned()),
                ],
                Duration::from_secs(30),
            )
            .await
            .unwrap();
        store
            .delete_batch(&["alice".to_owned(), "bob".to_owned()])
            .await
            .unwrap();
        let result = store
            .get_batch(&["alice".to_owned(), "bob".to_owned()])
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn distinct_sessions_have_independent_counters() {
        let store = InMemoryPresenceStore::new();
        let a = store.next_seq_id("session-a", 0).await.unwrap();
        let b = store.next_seq_id("session-b", 0).await.unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 1);
    }
}
