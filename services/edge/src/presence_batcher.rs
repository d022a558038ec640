use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use resonance_wire::{PresenceDelta, SyncStatusRequest};

use crate::logic_client::LogicClient;

const FLUSH_INTERVAL: Duration = Duration::from_secs(2);

enum Delta {
    Online(PresenceDelta),
    Offline(String),
}

/// Batches presence deltas and flushes them to Logic's `sync_status` RPC on
/// a fixed interval, tagging each batch with a strictly increasing local
/// `seq_id` so Logic can reject a reordered/duplicate delivery.
pub struct PresenceBatcher {
    logic: LogicClient,
    edge_id: String,
    pending: Mutex<Vec<Delta>>,
    next_seq: AtomicU64,
}

impl PresenceBatcher {
    pub fn new(logic: LogicClient, edge_id: String) -> Self {
        Self {
            logic,
            edge_id,
            pending: Mutex::new(Vec::new()),
            next_seq: AtomicU64::new(1),
        }
    }

    pub fn mark_online(&self, username: &str, remote_addr: &str) {
        self.pending.lock().unwrap().push(Delta::Online(PresenceDelta {
            username: username.to_owned(),
            remote_addr: remote_addr.to_owned(),
        }));
    }

    pub fn mark_offline(&self, username: &str) {
        self.pending
            .lock()
            .unwrap()
            .push(Delta::Offline(username.to_owned()));
    }

    fn take_pending(&self) -> Vec<Delta> {
        let mut pending = self.pending.lock().unwrap();
        std::mem::take(&mut *pending)
    }

    /// Puts deltas back at the front of the queue so a failed flush is
    /// retried ahead of whatever accumulated since, instead of being lost.
    fn requeue(&self, deltas: Vec<Delta>) {
        let mut pending = self.pending.lock().unwrap();
        let mut merged = deltas;
        merged.append(&mut pending);
        *pending = merged;
    }

    async fn flush(&self) {
        let deltas = self.take_pending();
        if deltas.is_empty() {
            return;
        }
        let mut online_batch = Vec::new();
        let mut offline_batch = Vec::new();
        for delta in &deltas {
            match delta {
                Delta::Online(d) => online_batch.push(d.clone()),
                Delta::Offline(u) => offline_batch.push(u.clone()),
            }
        }
        let seq_id = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let request = SyncStatusRequest {
            edge_id: self.edge_id.clone(),
            seq_id,
            online_batch,
            offline_batch,
        };
        if let Err(err) = self.logic.sync_status(&request).await {
            tracing::warn!(%err, "presence batch flush failed; re-queuing deltas for the next tick");
            self.requeue(deltas);
        }
    }
}

/// Spawns the periodic flush loop. Returns a handle only to keep the task
/// alive for the duration of `main`; there is no cancellation path beyond
/// process shutdown.
pub fn spawn(batcher: std::sync::Arc<PresenceBatcher>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(FLUSH_INTERVAL);
        loop {
            interval.tick().await;
            batcher.flush().await;
        }
    })
}
