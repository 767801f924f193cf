//! Session tracking for pickban.
//!
//! A *session* is a client identity that outlives any single connection:
//!
//! 1. **Attach**: a connection presents its session token; the session is
//!    created on first contact or resumed if it already exists.
//! 2. **Detach**: a connection closes; when the last one goes, the session
//!    enters its grace period.
//! 3. **Expire**: the grace period ran out with no reconnection; the
//!    session is removed.
//!
//! The registry only does bookkeeping. Scheduling the grace timer and
//! tearing down team membership belong to the hub above it.
//!
//! ```text
//! Hub (above)  ← owns the registry, schedules grace timers
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Protocol Layer (below)  ← SessionId, ConnectionId, PlayerInfo
//! ```

mod error;
mod registry;
mod session;

pub use error::SessionError;
pub use registry::{Attached, Detached, SessionRegistry};
pub use session::{Session, SessionConfig, SessionState};
