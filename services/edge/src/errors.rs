#[derive(Debug, thiserror::Error)]
pub enum LogicClientError {
    #[error("logic RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
