//! Per-connection handler: upgrade, handshake, and request forwarding.
//!
//! Each accepted TCP connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. WebSocket upgrade → Origin checked against the allow-list
//!   2. Receive Handshake → validate version and session token
//!   3. Register with the hub → hub sends HandshakeAck (and a resync)
//!   4. Loop: decode envelopes → forward to the hub
//!
//! Outbound traffic never touches this loop: a separate writer task drains
//! the connection's queue onto the socket.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use pickban_protocol::{
    ClientEnvelope, ClientRequest, Codec, ConnectionId, ProtocolError, ServerEnvelope, ServerEvent,
    SessionId,
};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::PickbanError;
use crate::hub::Command;
use crate::server::{PROTOCOL_VERSION, ServerState};
use crate::transport::{self, TransportError, WsStream};

/// How long a fresh connection has to send its handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Sends `Disconnect` to the hub when the handler exits, however it exits.
struct ConnectionGuard<'a> {
    conn: ConnectionId,
    state: &'a ServerState,
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        // Hub gone means the server is shutting down anyway.
        let _ = self.state.hub.send(Command::Disconnect { conn: self.conn });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    state: Arc<ServerState>,
) -> Result<(), PickbanError> {
    let ws = transport::upgrade(stream, &state.allowed_origins).await?;
    let (mut sink, mut source) = ws.split();

    // --- Step 1: Handshake ---
    let session_id = perform_handshake(&mut sink, &mut source, &state).await?;
    let conn = state.hub.next_connection_id();
    tracing::info!(%conn, %session_id, "connection handshaken");

    // --- Step 2: Register with the hub ---
    let (tx, rx) = mpsc::unbounded_channel();
    state.hub.send(Command::Connect {
        conn,
        session_id: session_id.clone(),
        outbound: tx,
    })?;
    let guard = ConnectionGuard {
        conn,
        state: &state,
    };
    let writer = tokio::spawn(write_loop(conn, sink, rx, Arc::clone(&state)));

    // --- Step 3: Read loop ---
    loop {
        let frame = match tokio::time::timeout(state.idle_timeout, source.next()).await {
            Ok(Some(Ok(frame))) => frame,
            Ok(Some(Err(e))) => {
                tracing::debug!(%conn, error = %e, "recv error");
                break;
            }
            Ok(None) => {
                tracing::info!(%conn, %session_id, "connection closed cleanly");
                break;
            }
            Err(_) => {
                tracing::info!(%conn, %session_id, "connection idle, closing");
                break;
            }
        };

        let data = match frame {
            Message::Text(text) => text.as_bytes().to_vec(),
            Message::Binary(data) => data.to_vec(),
            Message::Close(_) => break,
            _ => continue, // ping/pong/frame
        };

        let command = match state.codec.decode::<ClientEnvelope>(&data) {
            Ok(envelope) => Command::Request {
                conn,
                seq: envelope.seq,
                request: envelope.request,
            },
            Err(e) => Command::Malformed {
                conn,
                reason: e.to_string(),
            },
        };
        state.hub.send(command)?;
    }

    // Guard drops here → hub unregisters the queue → writer finishes.
    drop(guard);
    let _ = writer.await;
    Ok(())
}

/// Receives and validates the first frame.
async fn perform_handshake(
    sink: &mut WsSink,
    source: &mut WsSource,
    state: &ServerState,
) -> Result<SessionId, PickbanError> {
    let frame = match tokio::time::timeout(HANDSHAKE_TIMEOUT, source.next()).await {
        Ok(Some(Ok(frame))) => frame,
        Ok(Some(Err(e))) => return Err(TransportError::ReceiveFailed(e).into()),
        Ok(None) => {
            return Err(TransportError::ConnectionClosed("closed before handshake".into()).into());
        }
        Err(_) => {
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let data = match frame {
        Message::Text(text) => text.as_bytes().to_vec(),
        Message::Binary(data) => data.to_vec(),
        _ => Vec::new(),
    };
    let envelope: ClientEnvelope = match state.codec.decode(&data) {
        Ok(envelope) => envelope,
        Err(e) => {
            reject(sink, state, 0, "invalid-request", &e.to_string()).await?;
            return Err(e.into());
        }
    };

    let (version, raw_session) = match envelope.request {
        ClientRequest::Handshake {
            version,
            session_id,
        } => (version, session_id),
        _ => {
            reject(sink, state, envelope.seq, "invalid-request", "expected handshake").await?;
            return Err(
                ProtocolError::InvalidMessage("first message must be a handshake".into()).into(),
            );
        }
    };

    if version != PROTOCOL_VERSION {
        let message = format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}");
        reject(sink, state, envelope.seq, "invalid-request", &message).await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    match SessionId::parse(&raw_session) {
        Ok(session_id) => Ok(session_id),
        Err(e) => {
            reject(sink, state, envelope.seq, "invalid-request", &e.to_string()).await?;
            Err(e.into())
        }
    }
}

/// Writes a `rejected` reply straight to the socket. Only used before the
/// connection is registered with the hub.
async fn reject(
    sink: &mut WsSink,
    state: &ServerState,
    reply_to: u64,
    code: &str,
    message: &str,
) -> Result<(), PickbanError> {
    let envelope = ServerEnvelope {
        seq: 0,
        reply_to: Some(reply_to),
        event: ServerEvent::Rejected {
            code: code.to_string(),
            message: message.to_string(),
        },
    };
    let text = state.codec.encode_text(&envelope)?;
    sink.send(Message::Text(text.into()))
        .await
        .map_err(TransportError::SendFailed)?;
    Ok(())
}

/// Drains one connection's outbound queue onto its socket.
async fn write_loop(
    conn: ConnectionId,
    mut sink: WsSink,
    mut rx: mpsc::UnboundedReceiver<ServerEnvelope>,
    state: Arc<ServerState>,
) {
    while let Some(envelope) = rx.recv().await {
        let text = match state.codec.encode_text(&envelope) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%conn, event = envelope.event.name(), error = %e, "encode failed");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text.into())).await {
            tracing::debug!(%conn, error = %e, "send failed, writer stopping");
            break;
        }
    }
    let _ = sink.close().await;
}
