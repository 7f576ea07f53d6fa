//! Connection tracking and per-user presence.

pub mod handle;
pub mod registry;

pub use handle::ConnectionHandle;
pub use registry::{ConnectionRegistry, PresenceRecord, PresenceStatus, UserPresence};
