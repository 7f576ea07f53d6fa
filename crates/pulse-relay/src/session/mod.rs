//! Per-connection session lifecycle.

pub mod controller;
pub mod state;

pub use controller::{OpenedSession, SessionController};
pub use state::{Session, SessionPhase};
