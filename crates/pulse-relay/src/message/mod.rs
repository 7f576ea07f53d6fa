//! Inbound and outbound relay event definitions.

pub mod types;

pub use types::{InboundEvent, OutboundEvent};
