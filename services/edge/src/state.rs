use std::collections::HashMap;
use std::sync::Arc;

use resonance_wire::PushFrame;
use sqlx::PgPool;
use tokio::sync::{mpsc, RwLock};

use crate::logic_client::LogicClient;
use crate::presence_batcher::PresenceBatcher;

/// One open client connection: a channel into its write half, so any task
/// (the push HTTP handler, in particular) can hand it a frame to deliver
/// without touching the socket directly.
#[derive(Clone)]
pub struct ConnectionHandle {
    pub sender: mpsc::Sender<PushFrame>,
}

/// Shared state for the edge process. The connection registry is a
/// fine-grained `RwLock<HashMap<...>>` keyed by the connection's identity,
/// so lookups for one username never block registration of another.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub logic: LogicClient,
    pub edge_id: String,
    connections: Arc<RwLock<HashMap<String, ConnectionHandle>>>,
    pub presence: Arc<PresenceBatcher>,
}

impl AppState {
    pub fn new(pool: PgPool, logic: LogicClient, edge_id: String) -> Self {
        let presence = Arc::new(PresenceBatcher::new(logic.clone(), edge_id.clone()));
        Self {
            pool,
            logic,
            edge_id,
            connections: Arc::new(RwLock::new(HashMap::new())),
            presence,
        }
    }

    /// Registers a newly authenticated connection, replacing (and thereby
    /// closing out) any prior connection for the same username.
    pub async fn register(&self, username: &str, handle: ConnectionHandle) {
        self.connections
            .write()
            .await
            .insert(username.to_owned(), handle);
    }

    pub async fn unregister(&self, username: &str) {
        self.connections.write().await.remove(username);
    }

    pub async fn lookup(&self, username: &str) -> Option<ConnectionHandle> {
        self.connections.read().await.get(username).cloned()
    }
}
