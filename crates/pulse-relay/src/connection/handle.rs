//! Individual connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use pulse_core::types::{ConnectionId, UserId};

use crate::message::types::OutboundEvent;

/// A handle to a single physical connection.
///
/// Holds the sender half of the connection's outbound queue plus the
/// owning user. Delivery is fire-and-forget: a full queue drops the
/// event, a closed queue marks the handle dead.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection id.
    pub id: ConnectionId,
    /// User who owns this connection.
    pub user_id: UserId,
    /// Sender for outbound events.
    sender: mpsc::Sender<OutboundEvent>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle with a fresh id.
    pub fn new(user_id: UserId, sender: mpsc::Sender<OutboundEvent>) -> Self {
        Self {
            id: ConnectionId::new(),
            user_id,
            sender,
            alive: AtomicBool::new(true),
        }
    }

    /// Send an outbound event to this connection. Returns whether the
    /// event was queued.
    pub fn send(&self, event: OutboundEvent) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection as dead.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}
