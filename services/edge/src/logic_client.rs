use resonance_wire::{
    GetRecentMessagesRequest, GetRecentMessagesResponse, GetSessionListResponse,
    PullInboxDeltaRequest, PullInboxDeltaResponse, SendMessageRequest, SendMessageResponse,
    SyncStatusRequest, SyncStatusResponse, UpdateReadPositionRequest, UpdateReadPositionResponse,
};

use crate::errors::LogicClientError;

/// Thin `reqwest` wrapper over Logic's internal RPCs, one method per RPC.
#[derive(Clone)]
pub struct LogicClient {
    http: reqwest::Client,
    base_url: String,
}

impl LogicClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, LogicClientError> {
        let response = self
            .http
            .post(format!("{}/internal/v1/send-message", self.base_url))
            .json(request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }

    pub async fn sync_status(
        &self,
        request: &SyncStatusRequest,
    ) -> Result<SyncStatusResponse, LogicClientError> {
        let response = self
            .http
            .post(format!("{}/internal/v1/sync-status", self.base_url))
            .json(request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }

    pub async fn session_list(
        &self,
        username: &str,
    ) -> Result<GetSessionListResponse, LogicClientError> {
        let response = self
            .http
            .get(format!("{}/internal/v1/session-list", self.base_url))
            .query(&[("username", username)])
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }

    pub async fn recent_messages(
        &self,
        request: &GetRecentMessagesRequest,
    ) -> Result<GetRecentMessagesResponse, LogicClientError> {
        let response = self
            .http
            .post(format!("{}/internal/v1/history", self.base_url))
            .json(request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }

    pub async fn inbox_delta(
        &self,
        request: &PullInboxDeltaRequest,
    ) -> Result<PullInboxDeltaResponse, LogicClientError> {
        let response = self
            .http
            .post(format!("{}/internal/v1/inbox-delta", self.base_url))
            .json(request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }

    pub async fn update_read_position(
        &self,
        request: &UpdateReadPositionRequest,
    ) -> Result<UpdateReadPositionResponse, LogicClientError> {
        let response = self
            .http
            .post(format!("{}/internal/v1/read-position", self.base_url))
            .json(request)
            .send()
            .await?
            .json()
            .await?;
        Ok(response)
    }
}
