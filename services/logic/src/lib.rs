pub mod bus;
pub mod db;
pub mod errors;
pub mod http;
pub mod ingest;
pub mod outbox_relay;
pub mod repo;
pub mod state;
pub mod system_message;

pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::health::healthz))
        .route("/readyz", get(http::health::readyz))
        .route("/internal/v1/send-message", post(http::send_message::handler))
        .route("/internal/v1/sync-status", post(http::sync_status::handler))
        .route("/internal/v1/session-list", get(http::session_list::handler))
        .route("/internal/v1/history", post(http::history::handler))
        .route("/internal/v1/inbox-delta", post(http::inbox_delta::handler))
        .route(
            "/internal/v1/read-position",
            post(http::read_position::handler),
        )
        .with_state(state)
}
