use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use resonance_wire::{
    decode_envelope, encode_envelope, error_codes, AckFrame, ChatFrame, Envelope, Payload,
    PushFrame, SendMessageRequest,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::auth::{extract_bearer, validate_token};
use crate::state::{AppState, ConnectionHandle};

const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const PUSH_QUEUE_DEPTH: usize = 64;

pub async fn ws_connect_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
        .map(str::to_owned);
    ws.on_upgrade(move |socket| handle_socket(socket, state, remote_addr, token))
}

async fn send_ack(socket: &mut WebSocket, ref_seq: &str, ack: AckFrame) -> bool {
    let mut ack = ack;
    ack.ref_seq = ref_seq.to_owned();
    let envelope = Envelope {
        seq: String::new(),
        payload: Payload::Ack(ack),
    };
    match encode_envelope(&envelope) {
        Ok(bytes) => socket.send(Message::Binary(bytes)).await.is_ok(),
        Err(err) => {
            warn!(%err, "failed to encode ack envelope");
            false
        }
    }
}

/// `connecting -> authenticated -> active -> closing -> closed`.
/// `connecting` is everything up to a successful token
/// check; `authenticated` is the brief window before the registry insert
/// and presence announce land; the loop below is `active`; any `break` is
/// `closing`, and the function returning is `closed`.
async fn handle_socket(
    mut socket: WebSocket,
    state: AppState,
    remote_addr: SocketAddr,
    token: Option<String>,
) {
    let token = match token {
        Some(t) => t,
        None => {
            close_with_error(&mut socket, error_codes::INVALID_TOKEN, "missing Authorization header").await;
            return;
        }
    };
    let username = match validate_token(&state.pool, &token).await {
        Some(u) => u,
        None => {
            close_with_error(&mut socket, error_codes::INVALID_TOKEN, "unknown or revoked token").await;
            return;
        }
    };

    let (push_tx, mut push_rx) = mpsc::channel::<PushFrame>(PUSH_QUEUE_DEPTH);
    state
        .register(&username, ConnectionHandle { sender: push_tx })
        .await;
    state.presence.mark_online(&username, &remote_addr.to_string());
    info!(%username, %remote_addr, "client connected");

    loop {
        tokio::select! {
            frame = tokio::time::timeout(IDLE_TIMEOUT, socket.recv()) => {
                match frame {
                    Ok(Some(Ok(Message::Binary(bytes)))) => {
                        match decode_envelope(&bytes) {
                            Ok(envelope) => {
                                if !handle_inbound(&mut socket, &state, &username, envelope).await {
                                    break;
                                }
                            }
                            Err(err) => {
                                warn!(%username, %err, "malformed frame");
                                close_with_error(&mut socket, error_codes::MALFORMED_FRAME, "could not decode envelope").await;
                                break;
                            }
                        }
                    }
                    Ok(Some(Ok(Message::Close(_)))) | Ok(None) => {
                        info!(%username, "client disconnected");
                        break;
                    }
                    Ok(Some(Ok(_))) => {}
                    Ok(Some(Err(err))) => {
                        warn!(%username, %err, "websocket error");
                        break;
                    }
                    Err(_) => {
                        info!(%username, "idle timeout, closing connection");
                        break;
                    }
                }
            }
            Some(push) = push_rx.recv() => {
                let envelope = Envelope { seq: String::new(), payload: Payload::Push(push) };
                match encode_envelope(&envelope) {
                    Ok(bytes) => {
                        if socket.send(Message::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => warn!(%err, "failed to encode push envelope"),
                }
            }
        }
    }

    state.unregister(&username).await;
    state.presence.mark_offline(&username);
}

/// Returns `false` when the connection should close.
async fn handle_inbound(
    socket: &mut WebSocket,
    state: &AppState,
    username: &str,
    envelope: Envelope,
) -> bool {
    match envelope.payload {
        Payload::Pulse => true,
        Payload::Chat(frame) => handle_chat(socket, state, username, &envelope.seq, frame).await,
        Payload::Ack(_) | Payload::Push(_) => {
            warn!(%username, "unexpected frame kind from client");
            true
        }
    }
}

async fn handle_chat(
    socket: &mut WebSocket,
    state: &AppState,
    username: &str,
    ref_seq: &str,
    frame: ChatFrame,
) -> bool {
    let request = SendMessageRequest {
        from_username: username.to_owned(),
        session_id: frame.session_id,
        content: frame.content,
        msg_type: frame.msg_type,
        client_ts: frame.client_ts,
    };
    let ack = match state.logic.send_message(&request).await {
        Ok(response) => AckFrame {
            ref_seq: String::new(),
            msg_id: response.msg_id,
            seq_id: response.seq_id,
            error: response.error,
        },
        Err(err) => {
            warn!(%username, %err, "send_message RPC failed");
            AckFrame {
                ref_seq: String::new(),
                msg_id: None,
                seq_id: None,
                error: Some(error_codes::SERVER_ERROR.to_owned()),
            }
        }
    };
    send_ack(socket, ref_seq, ack).await
}

async fn close_with_error(socket: &mut WebSocket, code: &str, message: &str) {
    let envelope = Envelope {
        seq: String::new(),
        payload: Payload::Ack(AckFrame {
            ref_seq: String::new(),
            msg_id: None,
            seq_id: None,
            error: Some(code.to_owned()),
        }),
    };
    if let Ok(bytes) = encode_envelope(&envelope) {
        let _ = socket.send(Message::Binary(bytes)).await;
    }
    warn!(%code, %message, "closing connection");
}
