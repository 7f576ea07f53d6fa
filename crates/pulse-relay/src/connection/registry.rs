//! Connection registry — maps users to their live connections and tracks
//! per-user online/offline presence.
//!
//! Invariant: a user's status is `Online` if and only if their connection
//! set is non-empty. Offline records are retained for quick re-lookup;
//! all state is rebuilt from zero on process restart.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use pulse_auth::Identity;
use pulse_core::error::AppError;
use pulse_core::types::{ConnectionId, UserId};

use super::handle::ConnectionHandle;

/// Online/offline presence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// The user has at least one live connection.
    Online,
    /// The user has no live connections.
    Offline,
}

/// Serializable presence summary for one user, as sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPresence {
    /// User id.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
    /// Avatar URL, if any.
    pub avatar_url: Option<String>,
    /// Current status.
    pub status: PresenceStatus,
    /// Timestamp of the last status transition.
    pub last_active_at: DateTime<Utc>,
}

/// Presence record for one distinct user, regardless of connection count.
#[derive(Debug, Clone)]
pub struct PresenceRecord {
    /// User id.
    pub user_id: UserId,
    /// Display name from the verified identity.
    pub display_name: String,
    /// Avatar URL from the verified identity.
    pub avatar_url: Option<String>,
    /// Current status.
    pub status: PresenceStatus,
    /// Updated on every status transition.
    pub last_active_at: DateTime<Utc>,
    /// Ids of this user's live connections.
    pub connection_ids: HashSet<ConnectionId>,
}

impl PresenceRecord {
    /// Client-facing summary of this record.
    pub fn summary(&self) -> UserPresence {
        UserPresence {
            user_id: self.user_id,
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
            status: self.status,
            last_active_at: self.last_active_at,
        }
    }
}

/// Result of registering a connection.
#[derive(Debug, Clone)]
pub struct Registered {
    /// Whether this registration transitioned the user to online.
    pub became_online: bool,
    /// Presence summary after the registration.
    pub presence: UserPresence,
}

/// Result of unregistering a connection.
#[derive(Debug, Clone)]
pub struct Unregistered {
    /// Owner of the removed connection.
    pub user_id: UserId,
    /// Whether this removal transitioned the user to offline.
    pub became_offline: bool,
    /// Presence summary after the removal.
    pub presence: UserPresence,
}

#[derive(Debug, Default)]
struct Inner {
    /// User id → presence record. Offline records are retained.
    records: HashMap<UserId, PresenceRecord>,
    /// Connection id → handle, for direct lookup and delivery.
    handles: HashMap<ConnectionId, Arc<ConnectionHandle>>,
}

/// Thread-safe registry of all live connections and user presence.
///
/// Every operation is a single critical section; no lock is ever held
/// across an await point.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: RwLock<Inner>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection for a user.
    ///
    /// The first connection for a user transitions them to online.
    /// Registering an already-known connection id is ignored.
    pub fn register(&self, identity: &Identity, handle: Arc<ConnectionHandle>) -> Registered {
        let mut inner = self.inner.write();

        let record = inner
            .records
            .entry(identity.id)
            .or_insert_with(|| PresenceRecord {
                user_id: identity.id,
                display_name: identity.display_name.clone(),
                avatar_url: identity.avatar_url.clone(),
                status: PresenceStatus::Offline,
                last_active_at: Utc::now(),
                connection_ids: HashSet::new(),
            });

        if record.connection_ids.contains(&handle.id) {
            warn!(conn_id = %handle.id, user_id = %identity.id, "Duplicate connection id ignored");
            let presence = record.summary();
            return Registered {
                became_online: false,
                presence,
            };
        }

        // Identity is re-verified on every connect; refresh the profile.
        record.display_name = identity.display_name.clone();
        record.avatar_url = identity.avatar_url.clone();

        let became_online = record.connection_ids.is_empty();
        record.connection_ids.insert(handle.id);
        if became_online {
            record.status = PresenceStatus::Online;
            record.last_active_at = Utc::now();
        }
        let presence = record.summary();

        inner.handles.insert(handle.id, handle);

        Registered {
            became_online,
            presence,
        }
    }

    /// Removes a connection from its owner's set.
    ///
    /// Returns `UnknownConnection` for an id that was never registered
    /// (e.g. a double disconnect); callers tolerate this as a no-op.
    /// Removing the last connection transitions the user to offline; the
    /// record itself is retained.
    pub fn unregister(&self, conn_id: ConnectionId) -> Result<Unregistered, AppError> {
        let mut inner = self.inner.write();

        let handle = inner.handles.remove(&conn_id).ok_or_else(|| {
            AppError::unknown_connection(format!("Connection {conn_id} was never registered"))
        })?;
        handle.mark_dead();

        let record = inner.records.get_mut(&handle.user_id).ok_or_else(|| {
            AppError::unknown_connection(format!("No presence record for connection {conn_id}"))
        })?;

        record.connection_ids.remove(&conn_id);
        let became_offline = record.connection_ids.is_empty();
        if became_offline {
            record.status = PresenceStatus::Offline;
            record.last_active_at = Utc::now();
        }

        Ok(Unregistered {
            user_id: handle.user_id,
            became_offline,
            presence: record.summary(),
        })
    }

    /// All live connection handles for a user. Empty for unknown or
    /// offline users, never an error.
    pub fn sockets_of(&self, user_id: UserId) -> Vec<Arc<ConnectionHandle>> {
        let inner = self.inner.read();
        inner
            .records
            .get(&user_id)
            .map(|record| {
                record
                    .connection_ids
                    .iter()
                    .filter_map(|id| inner.handles.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Looks up a single connection handle.
    pub fn handle_of(&self, conn_id: ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.inner.read().handles.get(&conn_id).cloned()
    }

    /// Whether the user currently has at least one live connection.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.inner
            .read()
            .records
            .get(&user_id)
            .is_some_and(|r| r.status == PresenceStatus::Online)
    }

    /// Presence record snapshot for a user, if one exists.
    pub fn presence_of(&self, user_id: UserId) -> Option<PresenceRecord> {
        self.inner.read().records.get(&user_id).cloned()
    }

    /// Summaries of all currently-online users.
    pub fn online_snapshot(&self) -> Vec<UserPresence> {
        self.inner
            .read()
            .records
            .values()
            .filter(|r| r.status == PresenceStatus::Online)
            .map(PresenceRecord::summary)
            .collect()
    }

    /// All live connection handles.
    pub fn all_handles(&self) -> Vec<Arc<ConnectionHandle>> {
        self.inner.read().handles.values().cloned().collect()
    }

    /// Total live connection count.
    pub fn connection_count(&self) -> usize {
        self.inner.read().handles.len()
    }

    /// Number of currently-online users.
    pub fn online_user_count(&self) -> usize {
        self.inner
            .read()
            .records
            .values()
            .filter(|r| r.status == PresenceStatus::Online)
            .count()
    }
}
