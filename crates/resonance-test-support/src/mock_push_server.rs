// mock_push_server: stands in for an edge's internal push endpoint so
// dispatcher tests can assert on what it was asked to deliver without
// spinning up a real edge process.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use resonance_wire::{PushMessageRequest, PushMessageResponse};

#[derive(Default)]
struct Inner {
    received: Mutex<Vec<PushMessageRequest>>,
    delivered: Mutex<bool>,
}

/// A mock edge push endpoint. Binds to a random port; every `PushMessageRequest`
/// it receives is recorded and can be inspected with `received()`.
pub struct MockPushServer {
    addr: SocketAddr,
    inner: Arc<Inner>,
    _task: tokio::task::JoinHandle<()>,
}

impl MockPushServer {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let inner = Arc::new(Inner {
            received: Mutex::new(Vec::new()),
            delivered: Mutex::new(true),
        });

        let app = Router::new()
            .route("/internal/push", post(handle_push))
            .with_state(inner.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, inner, _task: task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn push_url(&self) -> String {
        format!("http://{}/internal/push", self.addr)
    }

    /// Control whether subsequent pushes report `delivered: false`, simulating
    /// a recipient that disconnected between the presence lookup and the push.
    pub fn set_delivered(&self, delivered: bool) {
        *self.inner.delivered.lock().expect("mutex poisoned") = delivered;
    }

    pub fn received(&self) -> Vec<PushMessageRequest> {
        self.inner.received.lock().expect("mutex poisoned").clone()
    }
}

async fn handle_push(
    State(inner): State<Arc<Inner>>,
    Json(request): Json<PushMessageRequest>,
) -> Json<PushMessageResponse> {
    inner.received.lock().expect("mutex poisoned").push(request);
    let delivered = *inner.delivered.lock().expect("mutex poisoned");
    Json(PushMessageResponse { delivered })
}
