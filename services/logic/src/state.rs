use std::collections::HashMap;
use std::sync::Arc;

use resonance_bus::BusPublisher;
use resonance_idgen::IdGenerator;
use resonance_presence::PresenceStore;
use sqlx::PgPool;
use tokio::sync::RwLock;

/// Shared state for every Logic HTTP handler: the pool plus the
/// presence/bus/id-generator collaborators this service needs, each behind
/// an `Arc` so the struct stays cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub presence: Arc<dyn PresenceStore>,
    pub bus: Arc<dyn BusPublisher>,
    pub idgen: Arc<IdGenerator>,
    /// Last-seen `sync_status` batch seq per edge, for rejecting stale/reordered batches.
    edge_seq: Arc<RwLock<HashMap<String, u64>>>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        presence: Arc<dyn PresenceStore>,
        bus: Arc<dyn BusPublisher>,
        idgen: Arc<IdGenerator>,
    ) -> Self {
        Self {
            pool,
            presence,
            bus,
            idgen,
            edge_seq: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Accepts the batch if `seq_id` is strictly greater than the last one
    /// seen for this edge, recording it either way for the next call.
    pub async fn accept_edge_batch_seq(&self, edge_id: &str, seq_id: u64) -> Result<(), u64> {
        let mut guard = self.edge_seq.write().await;
        let last_seen = *guard.get(edge_id).unwrap_or(&0);
        if seq_id <= last_seen {
            return Err(last_seen);
        }
        guard.insert(edge_id.to_owned(), seq_id);
        Ok(())
    }
}
