use std::collections::HashMap;

use resonance_wire::{PushFrame, PushMessageRequest, PushMessageResponse};

/// `edge_id -> base URL`, loaded once from `EDGE_ENDPOINTS` at startup: a
/// comma-separated `edge_id=http://host:port` list. Dispatcher does not do
/// service discovery.
pub fn parse_edge_endpoints(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| entry.split_once('='))
        .map(|(edge_id, url)| (edge_id.to_owned(), url.to_owned()))
        .collect()
}

#[derive(Clone)]
pub struct EdgeClient {
    http: reqwest::Client,
    endpoints: HashMap<String, String>,
}

impl EdgeClient {
    pub fn new(endpoints: HashMap<String, String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints,
        }
    }

    /// Invokes one edge's `PushMessage` RPC for one recipient. Failure is
    /// logged, not retried here -- the recipient pulls the gap via
    /// inbox-delta on its next reconnect.
    pub async fn push(&self, edge_id: &str, recipient_username: &str, envelope: &PushFrame) -> bool {
        let Some(base_url) = self.endpoints.get(edge_id) else {
            tracing::warn!(edge_id, "no known endpoint for edge; treating push as undelivered");
            return false;
        };

        let request = PushMessageRequest {
            recipient_username: recipient_username.to_owned(),
            envelope: envelope.clone(),
        };
        let result = self
            .http
            .post(format!("{base_url}/internal/push"))
            .json(&request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);

        match result {
            Ok(response) => match response.json::<PushMessageResponse>().await {
                Ok(body) => body.delivered,
                Err(err) => {
                    tracing::warn!(%err, edge_id, "could not decode push response");
                    false
                }
            },
            Err(err) => {
                tracing::warn!(%err, edge_id, recipient_username, "push RPC failed");
                false
            }
        }
    }
}
