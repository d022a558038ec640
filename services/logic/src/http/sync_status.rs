use std::time::Duration;

use axum::extract::State;
use axum::Json;
use resonance_wire::{SyncStatusRequest, SyncStatusResponse};

use crate::state::AppState;

/// Presence records survive 24h of silence before they expire on their own
///; a live edge refreshes this on every batch.
const PRESENCE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// `SyncStatus(edge_id, seq_id, online_batch, offline_batch) -> {seq_id, error}`.
/// Every entry in `online_batch`/`offline_batch` is attributed to `edge_id`,
/// the edge that owns the connections in this heartbeat.
pub async fn handler(
    State(state): State<AppState>,
    Json(request): Json<SyncStatusRequest>,
) -> Json<SyncStatusResponse> {
    if let Err(last_seen) = state
        .accept_edge_batch_seq(&request.edge_id, request.seq_id)
        .await
    {
        tracing::warn!(edge_id = %request.edge_id, seq_id = request.seq_id, last_seen, "rejected stale sync_status batch");
        return Json(SyncStatusResponse {
            seq_id: last_seen,
            error: Some("stale_batch".to_owned()),
        });
    }

    if !request.online_batch.is_empty() {
        let entries: Vec<(String, String)> = request
            .online_batch
            .iter()
            .map(|delta| (delta.username.clone(), request.edge_id.clone()))
            .collect();
        if let Err(err) = state.presence.set_batch(&entries, PRESENCE_TTL).await {
            tracing::error!(%err, edge_id = %request.edge_id, count = entries.len(), "failed to record presence online batch");
        }
    }
    if !request.offline_batch.is_empty() {
        if let Err(err) = state.presence.delete_batch(&request.offline_batch).await {
            tracing::error!(%err, edge_id = %request.edge_id, count = request.offline_batch.len(), "failed to record presence offline batch");
        }
    }

    Json(SyncStatusResponse {
        seq_id: request.seq_id,
        error: None,
    })
}
