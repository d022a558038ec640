#[derive(Debug, thiserror::Error)]
pub enum DispatcherError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("presence store error")]
    Presence(#[from] resonance_presence::PresenceError),
}
