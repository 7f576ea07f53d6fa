//! Top-level relay engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

use pulse_auth::IdentityVerifier;
use pulse_core::config::relay::RelayConfig;
use pulse_gateway::PersistenceGateway;

use crate::connection::registry::ConnectionRegistry;
use crate::fanout::router::FanoutRouter;
use crate::membership::registry::GroupRegistry;
use crate::session::controller::SessionController;
use crate::typing::registry::TypingRegistry;

/// Central relay engine that coordinates all fanout subsystems.
#[derive(Clone)]
pub struct RelayEngine {
    /// Connection registry with per-user presence.
    pub connections: Arc<ConnectionRegistry>,
    /// Group membership registry.
    pub groups: Arc<GroupRegistry>,
    /// Typing-state registry.
    pub typing: Arc<TypingRegistry>,
    /// Fanout router.
    pub router: Arc<FanoutRouter>,
    /// Session lifecycle controller.
    pub sessions: Arc<SessionController>,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RelayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayEngine").finish()
    }
}

impl RelayEngine {
    /// Creates a new relay engine with all subsystems.
    pub fn new(
        config: RelayConfig,
        verifier: Arc<dyn IdentityVerifier>,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let connections = Arc::new(ConnectionRegistry::new());
        let groups = Arc::new(GroupRegistry::new());
        let typing = Arc::new(TypingRegistry::new());
        let router = Arc::new(FanoutRouter::new(connections.clone(), groups.clone()));
        let sessions = Arc::new(SessionController::new(
            config,
            connections.clone(),
            groups.clone(),
            typing.clone(),
            router.clone(),
            verifier,
            gateway,
        ));

        info!("Relay engine initialized");

        Self {
            connections,
            groups,
            typing,
            router,
            sessions,
            shutdown_tx,
        }
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown: signals tasks to stop and tears
    /// down every live connection.
    pub fn shutdown(&self) {
        info!("Shutting down relay engine");

        let _ = self.shutdown_tx.send(());

        for handle in self.connections.all_handles() {
            self.sessions.disconnect(handle.id);
        }

        info!("Relay engine shut down");
    }
}
