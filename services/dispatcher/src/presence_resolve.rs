use std::collections::HashMap;
use std::sync::Arc;

use resonance_presence::PresenceStore;

use crate::errors::DispatcherError;

/// Batch-resolve `recipient -> edge_id`, then bucket recipients by edge.
/// A recipient absent from the presence
/// store is offline; their delivery is already complete via the inbox row,
/// so they simply don't appear in the returned map.
pub async fn group_by_edge(
    presence: &Arc<dyn PresenceStore>,
    recipients: &[String],
) -> Result<HashMap<String, Vec<String>>, DispatcherError> {
    let online = presence.get_batch(recipients).await?;

    let mut by_edge: HashMap<String, Vec<String>> = HashMap::new();
    for (username, edge_id) in online {
        by_edge.entry(edge_id).or_default().push(username);
    }
    Ok(by_edge)
}
