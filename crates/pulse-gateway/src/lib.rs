//! # pulse-gateway
//!
//! Thin gateway to the persistence REST API. The relay does not store
//! posts or chat messages; it forwards write-shaped events here and fans
//! out the canonical stored representation the API returns.

pub mod client;
pub mod types;

pub use client::{HttpPersistenceClient, PersistenceGateway};
pub use types::{AuthContext, OutgoingMessage, StoredMessage, StoredPost};
