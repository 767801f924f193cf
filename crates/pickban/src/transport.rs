//! WebSocket transport using `tokio-tungstenite`.
//!
//! The listener only accepts TCP; the WebSocket upgrade (including the
//! Origin check) runs in the per-connection task so a slow client cannot
//! stall the accept loop.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;

/// An upgraded server-side socket.
pub(crate) type WsStream = WebSocketStream<TcpStream>;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] tokio_tungstenite::tungstenite::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] tokio_tungstenite::tungstenite::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The WebSocket upgrade was refused or failed.
    #[error("upgrade failed: {0}")]
    UpgradeFailed(#[source] tokio_tungstenite::tungstenite::Error),
}

// ---------------------------------------------------------------------------
// Allowed origins
// ---------------------------------------------------------------------------

/// Which browser origins may open a WebSocket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// Accept every origin.
    #[default]
    Any,
    /// Accept only these exact origins.
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parses a comma-separated origin list. `*` (or an empty list) allows
    /// any origin.
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(|o| o.trim_end_matches('/').to_string())
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            Self::Any
        } else {
            Self::List(origins)
        }
    }

    /// Whether a request carrying `origin` may connect. Requests without an
    /// Origin header come from non-browser clients and are allowed.
    pub fn permits(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (Self::Any, _) | (_, None) => true,
            (Self::List(list), Some(origin)) => {
                let origin = origin.trim_end_matches('/');
                list.iter().any(|allowed| allowed == origin)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Listens for incoming TCP connections to upgrade.
pub(crate) struct WebSocketListener {
    listener: TcpListener,
}

impl WebSocketListener {
    /// Binds to the given address.
    pub(crate) async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self { listener })
    }

    pub(crate) fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits for the next TCP connection.
    pub(crate) async fn accept(&self) -> Result<(TcpStream, SocketAddr), TransportError> {
        self.listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)
    }
}

/// Performs the WebSocket upgrade, answering 403 to disallowed origins.
pub(crate) async fn upgrade(
    stream: TcpStream,
    origins: &AllowedOrigins,
) -> Result<WsStream, TransportError> {
    let origins = origins.clone();
    let check = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let origin = req
            .headers()
            .get("origin")
            .and_then(|value| value.to_str().ok());
        if origins.permits(origin) {
            return Ok(resp);
        }
        tracing::warn!(origin = origin.unwrap_or_default(), "origin rejected");
        let mut refused = ErrorResponse::new(Some("origin not allowed".to_string()));
        *refused.status_mut() = StatusCode::FORBIDDEN;
        Err(refused)
    };
    tokio_tungstenite::accept_hdr_async(stream, check)
        .await
        .map_err(TransportError::UpgradeFailed)
}
