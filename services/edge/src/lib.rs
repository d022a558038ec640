pub mod auth;
pub mod db;
pub mod errors;
pub mod logic_client;
pub mod presence_batcher;
pub mod push_api;
pub mod state;
pub mod ws;

pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws/v1/connect", get(ws::ws_connect_handler))
        .route("/internal/push", post(push_api::handler))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .with_state(state)
}

mod health {
    use axum::response::IntoResponse;
    pub async fn healthz() -> impl IntoResponse {
        "ok"
    }
    pub async fn readyz() -> impl IntoResponse {
        "ok"
    }
}
