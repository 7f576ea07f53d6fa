//! Fanout router — delivers one logical event to a computed set of
//! connections.
//!
//! Delivery is fire-and-forget: no acknowledgment is awaited, and a
//! target connection that no longer exists is silently dropped, never an
//! error to the caller.

use std::sync::Arc;

use tracing::trace;

use pulse_core::types::{ConnectionId, GroupId, UserId};

use crate::connection::registry::ConnectionRegistry;
use crate::membership::registry::{GroupKind, GroupRegistry};
use crate::message::types::OutboundEvent;

/// Routes events to connections, users, groups, or everyone.
#[derive(Debug)]
pub struct FanoutRouter {
    connections: Arc<ConnectionRegistry>,
    groups: Arc<GroupRegistry>,
}

impl FanoutRouter {
    /// Creates a router over the given registries.
    pub fn new(connections: Arc<ConnectionRegistry>, groups: Arc<GroupRegistry>) -> Self {
        Self {
            connections,
            groups,
        }
    }

    /// Delivers to a single connection. A vanished connection is a
    /// silent drop.
    pub fn to_connection(&self, conn_id: ConnectionId, event: OutboundEvent) {
        if let Some(handle) = self.connections.handle_of(conn_id) {
            handle.send(event);
        } else {
            trace!(conn_id = %conn_id, "Delivery target gone, dropping event");
        }
    }

    /// Delivers to every live connection of one user.
    pub fn to_user(&self, user_id: UserId, event: &OutboundEvent) {
        for handle in self.connections.sockets_of(user_id) {
            handle.send(event.clone());
        }
    }

    /// Delivers to every live connection of every member of a group,
    /// optionally excluding the originating connection.
    pub fn to_group(
        &self,
        kind: GroupKind,
        group_id: GroupId,
        exclude: Option<ConnectionId>,
        event: &OutboundEvent,
    ) {
        for user_id in self.groups.member_user_ids(kind, group_id) {
            for handle in self.connections.sockets_of(user_id) {
                if Some(handle.id) == exclude {
                    continue;
                }
                handle.send(event.clone());
            }
        }
    }

    /// Delivers to every live connection.
    pub fn to_all(&self, event: &OutboundEvent) {
        for handle in self.connections.all_handles() {
            handle.send(event.clone());
        }
    }
}
