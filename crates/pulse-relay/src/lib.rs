//! # pulse-relay
//!
//! Real-time presence and message-fanout core for Pulsehub. Provides:
//!
//! - Connection registry with per-user presence (multiple sockets per user)
//! - Group membership registry for communities and channels
//! - Typing-state registry scoped to channel groups
//! - Fanout router with connection/user/group/broadcast delivery scopes
//! - Session lifecycle controller driving all of the above on connect,
//!   inbound events, and disconnect
//!
//! The transport layer (WebSocket handshake, heartbeat, reconnection) is
//! external; this crate consumes opened/closed/event signals and emits
//! events to computed socket sets.

pub mod connection;
pub mod fanout;
pub mod membership;
pub mod message;
pub mod server;
pub mod session;
pub mod typing;

pub use connection::registry::ConnectionRegistry;
pub use fanout::router::FanoutRouter;
pub use membership::registry::GroupRegistry;
pub use server::RelayEngine;
pub use session::controller::SessionController;
pub use typing::registry::TypingRegistry;
