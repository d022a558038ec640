// mock_ws_client: drives the edge's client-facing WebSocket endpoint in tests.
//
// Unlike a JSON protocol, every frame here is a bincode-encoded `Envelope`
// carried as a WS *binary* frame, so this client speaks that framing
// directly instead of going through a generic JSON test client.

use futures_util::{SinkExt, StreamExt};
use resonance_wire::{decode_envelope, encode_envelope, Envelope};
use tokio_tungstenite::tungstenite::handshake::client::generate_key;
use tokio_tungstenite::tungstenite::http::Request;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::MaybeTlsStream;

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct MockWsClient {
    write: futures_util::stream::SplitSink<WsStream, Message>,
    read: futures_util::stream::SplitStream<WsStream>,
}

impl MockWsClient {
    pub async fn connect_with_token(
        url: &str,
        token: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let uri: tokio_tungstenite::tungstenite::http::Uri = url.parse()?;
        let host = uri.host().unwrap_or("localhost").to_owned();
        let host_header = match uri.port_u16() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        };
        let request = Request::builder()
            .uri(url)
            .header("Host", host_header)
            .header("Authorization", format!("Bearer {token}"))
            .header("Upgrade", "websocket")
            .header("Connection", "Upgrade")
            .header("Sec-WebSocket-Version", "13")
            .header("Sec-WebSocket-Key", generate_key())
            .body(())?;
        let (ws_stream, _response) = tokio_tungstenite::connect_async(request).await?;
        let (write, read) = ws_stream.split();
        Ok(Self { write, read })
    }

    pub async fn send(&mut self, envelope: &Envelope) -> Result<(), Box<dyn std::error::Error>> {
        let bytes = encode_envelope(envelope)?;
        self.write.send(Message::Binary(bytes.into())).await?;
        Ok(())
    }

    /// Receive the next non-control frame, decoded back into an `Envelope`.
    pub async fn recv(&mut self) -> Result<Envelope, Box<dyn std::error::Error>> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Binary(bytes))) => return Ok(decode_envelope(&bytes)?),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(other)) => {
                    return Err(format!("expected a binary frame, got {other:?}").into())
                }
                Some(Err(err)) => return Err(err.into()),
                None => return Err("connection closed".into()),
            }
        }
    }
}
