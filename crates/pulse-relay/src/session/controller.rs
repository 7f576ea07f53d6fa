//! Session lifecycle controller — orchestrates the registries, fanout
//! router, identity verifier, and persistence gateway on connect,
//! inbound events, and disconnect.
//!
//! Failures local to one connection's handler are converted into an
//! `error` event to that connection or a logged no-op; they never
//! terminate unrelated connections or the process.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use pulse_auth::{Identity, IdentityVerifier};
use pulse_core::config::relay::RelayConfig;
use pulse_core::error::{AppError, ErrorKind};
use pulse_core::types::{ChannelId, ConnectionId, GroupId, UserId};
use pulse_gateway::types::{AuthContext, OutgoingMessage};
use pulse_gateway::PersistenceGateway;

use crate::connection::handle::ConnectionHandle;
use crate::connection::registry::ConnectionRegistry;
use crate::fanout::router::FanoutRouter;
use crate::membership::registry::{GroupKind, GroupRegistry};
use crate::membership::MemberProfile;
use crate::message::types::{InboundEvent, OutboundEvent};
use crate::typing::registry::TypingRegistry;

use super::state::{Session, SessionPhase};

/// A successfully opened session: the connection handle plus the
/// receiver end of its outbound event queue, to be drained by the
/// transport adapter.
#[derive(Debug)]
pub struct OpenedSession {
    /// Handle registered with the relay.
    pub handle: Arc<ConnectionHandle>,
    /// Outbound events for this connection.
    pub events: mpsc::Receiver<OutboundEvent>,
}

/// Orchestrates the per-connection lifecycle and all inbound events.
pub struct SessionController {
    config: RelayConfig,
    connections: Arc<ConnectionRegistry>,
    groups: Arc<GroupRegistry>,
    typing: Arc<TypingRegistry>,
    router: Arc<FanoutRouter>,
    verifier: Arc<dyn IdentityVerifier>,
    gateway: Arc<dyn PersistenceGateway>,
    /// Connection id → session state.
    sessions: DashMap<ConnectionId, Session>,
    /// Per-user locks serializing lifecycle mutations (register, join,
    /// teardown sweep) so a disconnect sweep cannot race a concurrent
    /// join for the same user.
    user_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl SessionController {
    /// Creates a controller over the given registries and adapters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: RelayConfig,
        connections: Arc<ConnectionRegistry>,
        groups: Arc<GroupRegistry>,
        typing: Arc<TypingRegistry>,
        router: Arc<FanoutRouter>,
        verifier: Arc<dyn IdentityVerifier>,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            config,
            connections,
            groups,
            typing,
            router,
            verifier,
            gateway,
            sessions: DashMap::new(),
            user_locks: DashMap::new(),
        }
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.user_locks.entry(user_id).or_default().clone()
    }

    /// Handles a transport-level "connection opened" signal.
    ///
    /// Verifies the credential (or applies the guest policy), registers
    /// the connection, announces presence if the user came online, and
    /// sends the new connection a snapshot of who is online. On
    /// verification failure the connection is rejected and no relay
    /// state is created.
    pub async fn connect(&self, credential: Option<String>) -> Result<OpenedSession, AppError> {
        let identity = match credential.as_deref() {
            Some(token) => self.verifier.verify(token).await?,
            None => {
                if !self.config.allow_anonymous {
                    return Err(AppError::authentication(
                        "No credential supplied and anonymous connections are disabled",
                    ));
                }
                info!("Admitting anonymous connection with guest identity");
                Identity::guest(&self.config.guest_display_name)
            }
        };

        let (tx, rx) = mpsc::channel(self.config.outbound_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(identity.id, tx));

        self.sessions.insert(
            handle.id,
            Session {
                identity: identity.clone(),
                credential,
                phase: SessionPhase::Authenticated,
            },
        );

        let registered = {
            let lock = self.user_lock(identity.id);
            let _guard = lock.lock();
            self.connections.register(&identity, handle.clone())
        };

        if let Some(mut session) = self.sessions.get_mut(&handle.id) {
            session.phase = SessionPhase::Active;
        }

        if registered.became_online {
            self.router.to_all(&OutboundEvent::PresenceUpdate {
                user: registered.presence,
            });
        }

        handle.send(OutboundEvent::PresenceState {
            users: self.connections.online_snapshot(),
        });

        info!(
            conn_id = %handle.id,
            user_id = %identity.id,
            became_online = registered.became_online,
            "Connection active"
        );

        Ok(OpenedSession { handle, events: rx })
    }

    /// Handles one inbound event from an active connection.
    ///
    /// Events for sessions that are not `Active` are rejected with a
    /// `SESSION_NOT_READY` error event.
    pub async fn handle_event(&self, conn_id: ConnectionId, event: InboundEvent) {
        let session = self.sessions.get(&conn_id).map(|entry| entry.value().clone());
        let session = match session {
            Some(s) if s.phase == SessionPhase::Active => s,
            _ => {
                warn!(conn_id = %conn_id, "Event for inactive session rejected");
                self.router.to_connection(
                    conn_id,
                    OutboundEvent::Error {
                        code: ErrorKind::SessionNotReady.to_string(),
                        message: "Session is not active".to_string(),
                    },
                );
                return;
            }
        };

        let result = match event {
            InboundEvent::JoinGroup { kind, group_id } => {
                self.handle_join_group(conn_id, &session, kind, group_id)
            }
            InboundEvent::NewPost { payload } => self.handle_new_post(conn_id, &session, payload),
            InboundEvent::Typing {
                channel_id,
                is_typing,
            } => self.handle_typing(conn_id, &session, channel_id, is_typing),
            InboundEvent::DirectMessage {
                recipient_id,
                content,
            } => {
                self.handle_direct_message(conn_id, &session, recipient_id, content)
                    .await
            }
        };

        if let Err(e) = result {
            warn!(
                conn_id = %conn_id,
                user_id = %session.identity.id,
                error = %e,
                "Event handling failed"
            );
            self.router.to_connection(
                conn_id,
                OutboundEvent::Error {
                    code: e.kind.to_string(),
                    message: e.message,
                },
            );
        }
    }

    /// Handles a transport-level "connection closed" signal.
    ///
    /// Teardown order: unregister from the connection registry; then,
    /// only if the user's last connection closed, broadcast offline
    /// presence, sweep group memberships announcing departures, and
    /// sweep typing state announcing stops. A teardown for an id that
    /// was never registered is a tolerated, logged no-op.
    pub fn disconnect(&self, conn_id: ConnectionId) {
        let session = self.sessions.remove(&conn_id).map(|(_, s)| s);

        let lock = session.as_ref().map(|s| self.user_lock(s.identity.id));
        let _guard = lock.as_ref().map(|l| l.lock());

        let unregistered = match self.connections.unregister(conn_id) {
            Ok(u) => u,
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "Teardown for unknown connection ignored");
                return;
            }
        };

        info!(
            conn_id = %conn_id,
            user_id = %unregistered.user_id,
            became_offline = unregistered.became_offline,
            "Connection closed"
        );

        // Presence and membership are user-scoped, not connection-scoped:
        // while other connections remain, nothing else changes.
        if !unregistered.became_offline {
            return;
        }

        let user_id = unregistered.user_id;

        self.router.to_all(&OutboundEvent::PresenceUpdate {
            user: unregistered.presence,
        });

        for (kind, group_id) in self.groups.leave_all_for_user(user_id) {
            self.router.to_group(
                kind,
                group_id,
                None,
                &OutboundEvent::MemberLeft {
                    kind,
                    group_id,
                    user_id,
                },
            );
        }

        for channel_id in self.typing.clear_all_for_user(user_id) {
            self.router.to_group(
                GroupKind::Channel,
                channel_id,
                None,
                &OutboundEvent::TypingUpdate {
                    channel_id,
                    user_id,
                    is_typing: false,
                },
            );
        }
    }

    /// Current member profile for the session's user, preferring live
    /// presence data.
    fn profile_of(&self, session: &Session) -> MemberProfile {
        self.connections
            .presence_of(session.identity.id)
            .map(|record| record.summary())
            .unwrap_or_else(|| MemberProfile {
                user_id: session.identity.id,
                display_name: session.identity.display_name.clone(),
                avatar_url: session.identity.avatar_url.clone(),
                status: crate::connection::PresenceStatus::Online,
                last_active_at: chrono::Utc::now(),
            })
    }

    fn handle_join_group(
        &self,
        conn_id: ConnectionId,
        session: &Session,
        kind: GroupKind,
        group_id: GroupId,
    ) -> Result<(), AppError> {
        let profile = self.profile_of(session);

        let members = {
            let lock = self.user_lock(session.identity.id);
            let _guard = lock.lock();
            self.groups.join(kind, group_id, profile.clone())
        };

        debug!(
            conn_id = %conn_id,
            user_id = %session.identity.id,
            group_id = %group_id,
            "Joined group"
        );

        // Every join announces: a reconnect is indistinguishable from a
        // fresh join at this layer.
        self.router.to_group(
            kind,
            group_id,
            Some(conn_id),
            &OutboundEvent::MemberJoined {
                kind,
                group_id,
                profile,
            },
        );

        self.router.to_connection(
            conn_id,
            OutboundEvent::GroupMembers {
                kind,
                group_id,
                members,
            },
        );

        Ok(())
    }

    /// Broadcast first, persist after: posts favor perceived latency.
    /// A persistence failure is logged and never retracts the broadcast.
    fn handle_new_post(
        &self,
        conn_id: ConnectionId,
        session: &Session,
        payload: serde_json::Value,
    ) -> Result<(), AppError> {
        let author_id = session.identity.id;

        self.router.to_all(&OutboundEvent::PostNew {
            author_id,
            payload: payload.clone(),
        });

        let gateway = Arc::clone(&self.gateway);
        let ctx = AuthContext {
            user_id: author_id,
            credential: session.credential.clone(),
        };
        tokio::spawn(async move {
            match gateway.create_post(&payload, &ctx).await {
                Ok(stored) => {
                    debug!(post_id = %stored.id, author_id = %author_id, "Post persisted");
                }
                Err(e) => {
                    warn!(
                        conn_id = %conn_id,
                        author_id = %author_id,
                        error = %e,
                        "Post broadcast but persistence failed"
                    );
                }
            }
        });

        Ok(())
    }

    /// Persist first, fan out after: direct messages must carry a
    /// durable id before recipients see them.
    async fn handle_direct_message(
        &self,
        conn_id: ConnectionId,
        session: &Session,
        recipient_id: UserId,
        content: String,
    ) -> Result<(), AppError> {
        let outgoing = OutgoingMessage {
            recipient_id,
            content,
        };
        let ctx = AuthContext {
            user_id: session.identity.id,
            credential: session.credential.clone(),
        };

        let stored = self.gateway.create_message(&outgoing, &ctx).await?;

        self.router.to_user(
            recipient_id,
            &OutboundEvent::MessageNew {
                message: stored.clone(),
            },
        );

        // The sender may have disconnected while the persist call was in
        // flight; the router drops the acknowledgment silently then.
        self.router
            .to_connection(conn_id, OutboundEvent::MessageSent { message: stored });

        Ok(())
    }

    fn handle_typing(
        &self,
        conn_id: ConnectionId,
        session: &Session,
        channel_id: ChannelId,
        is_typing: bool,
    ) -> Result<(), AppError> {
        let user_id = session.identity.id;

        if !self.typing.set_typing(channel_id, user_id, is_typing) {
            // Client re-sent its current state; nothing to broadcast.
            return Ok(());
        }

        self.router.to_group(
            GroupKind::Channel,
            channel_id,
            Some(conn_id),
            &OutboundEvent::TypingUpdate {
                channel_id,
                user_id,
                is_typing,
            },
        );

        Ok(())
    }

    /// Number of tracked sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
