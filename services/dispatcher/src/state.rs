use std::sync::Arc;

use resonance_presence::PresenceStore;
use sqlx::PgPool;

use crate::edge_client::EdgeClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub presence: Arc<dyn PresenceStore>,
    pub edges: EdgeClient,
}

impl AppState {
    pub fn new(pool: PgPool, presence: Arc<dyn PresenceStore>, edges: EdgeClient) -> Self {
        Self {
            pool,
            presence,
            edges,
        }
    }
}
