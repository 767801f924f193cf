//! # pickban
//!
//! Real-time coordinator for two-sided ban/pick drafts.
//!
//! Clients connect over WebSocket, present a durable session token, form
//! teams, pick sides, and then take turns banning and picking items. A
//! timed post-game vote decides the winner. Short disconnects are
//! forgiven: a session that comes back within its grace period keeps its
//! team, side and draft view.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pickban::prelude::*;
//!
//! # async fn start() -> Result<(), PickbanError> {
//! let server = PickbanServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod gateway;
mod handler;
mod hub;
mod server;
mod transport;

pub use error::PickbanError;
pub use gateway::{Gateway, Group, Outbound};
pub use hub::{Command, Hub, HubConfig, HubHandle, TimerKey};
pub use server::{PROTOCOL_VERSION, PickbanServer, PickbanServerBuilder};
pub use transport::{AllowedOrigins, TransportError};

/// Everything needed to embed or drive a pickban server.
pub mod prelude {
    pub use crate::{
        AllowedOrigins, Command, Hub, HubConfig, HubHandle, PROTOCOL_VERSION, PickbanError,
        PickbanServer, PickbanServerBuilder, TimerKey,
    };
    pub use pickban_draft::{DraftError, DraftState, Team, TeamDirectory};
    pub use pickban_protocol::{
        ClientEnvelope, ClientRequest, ConnectionId, Phase, ServerEnvelope, ServerEvent,
        SessionId, Side, TeamId, TeamMode, TeamStatus, Winner,
    };
    pub use pickban_session::SessionConfig;
}
