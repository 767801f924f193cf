//! `PickbanServer` builder and accept loop.
//!
//! This is the entry point for running a pickban server. It ties together
//! all the layers: transport → handler → hub → sessions/teams/timers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pickban_protocol::JsonCodec;

use crate::PickbanError;
use crate::handler::handle_connection;
use crate::hub::{Hub, HubConfig, HubHandle};
use crate::transport::{AllowedOrigins, WebSocketListener};

/// The current protocol version. Clients must send this in their
/// handshake or be rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Shared state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) hub: HubHandle,
    pub(crate) codec: JsonCodec,
    pub(crate) allowed_origins: AllowedOrigins,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a pickban server.
///
/// # Example
///
/// ```rust,no_run
/// use pickban::prelude::*;
///
/// # async fn start() -> Result<(), PickbanError> {
/// let server = PickbanServer::builder()
///     .bind("0.0.0.0:8080")
///     .allowed_origins(AllowedOrigins::parse("https://draft.example"))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct PickbanServerBuilder {
    bind_addr: String,
    allowed_origins: AllowedOrigins,
    hub_config: HubConfig,
    idle_timeout: Duration,
}

impl PickbanServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            allowed_origins: AllowedOrigins::Any,
            hub_config: HubConfig::default(),
            idle_timeout: Duration::from_secs(60),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Restricts which browser origins may connect.
    pub fn allowed_origins(mut self, origins: AllowedOrigins) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// Sets grace period, game duration, voting window and chat limit.
    pub fn hub_config(mut self, config: HubConfig) -> Self {
        self.hub_config = config;
        self
    }

    /// Closes connections that send nothing for this long.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Binds the listener and starts the hub task.
    pub async fn build(self) -> Result<PickbanServer, PickbanError> {
        let listener = WebSocketListener::bind(&self.bind_addr).await?;

        let (hub, handle) = Hub::new(self.hub_config);
        tokio::spawn(hub.run());

        let state = Arc::new(ServerState {
            hub: handle,
            codec: JsonCodec,
            allowed_origins: self.allowed_origins,
            idle_timeout: self.idle_timeout,
        });

        Ok(PickbanServer { listener, state })
    }
}

impl Default for PickbanServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running pickban server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PickbanServer {
    listener: WebSocketListener,
    state: Arc<ServerState>,
}

impl PickbanServer {
    /// Creates a new builder.
    pub fn builder() -> PickbanServerBuilder {
        PickbanServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(self) -> Result<(), PickbanError> {
        tracing::info!("pickban server running");

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, state).await {
                            tracing::debug!(%addr, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
