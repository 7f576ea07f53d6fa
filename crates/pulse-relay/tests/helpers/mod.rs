//! Shared test fixtures: mock identity verifier and persistence gateway.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::Notify;

use pulse_auth::{Identity, IdentityVerifier};
use pulse_core::config::relay::RelayConfig;
use pulse_core::error::AppError;
use pulse_core::types::{MessageId, PostId, UserId};
use pulse_gateway::types::{AuthContext, OutgoingMessage, StoredMessage, StoredPost};
use pulse_gateway::PersistenceGateway;
use pulse_relay::connection::ConnectionHandle;
use pulse_relay::connection::PresenceStatus;
use pulse_relay::message::types::OutboundEvent;
use pulse_relay::RelayEngine;

/// Verifier backed by an in-memory credential table.
#[derive(Default)]
pub struct MockVerifier {
    users: Mutex<HashMap<String, Identity>>,
}

impl MockVerifier {
    /// Registers a credential and returns the identity it verifies to.
    pub fn register(&self, credential: &str, display_name: &str) -> Identity {
        let identity = Identity {
            id: UserId::new(),
            display_name: display_name.to_string(),
            avatar_url: None,
        };
        self.users
            .lock()
            .insert(credential.to_string(), identity.clone());
        identity
    }
}

#[async_trait]
impl IdentityVerifier for MockVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, AppError> {
        self.users
            .lock()
            .get(credential)
            .cloned()
            .ok_or_else(|| AppError::authentication("unknown credential"))
    }
}

/// Gateway that records writes and can be flipped into failure mode.
#[derive(Default)]
pub struct MockGateway {
    /// When set, every write fails with a persistence error.
    pub fail: AtomicBool,
    /// Number of create_post calls observed.
    pub post_calls: AtomicUsize,
    /// Number of create_message calls observed.
    pub message_calls: AtomicUsize,
    /// Signaled after each create_post call completes, so tests can
    /// await the spawned persist task.
    pub post_done: Notify,
}

#[async_trait]
impl PersistenceGateway for MockGateway {
    async fn create_post(
        &self,
        payload: &serde_json::Value,
        ctx: &AuthContext,
    ) -> Result<StoredPost, AppError> {
        self.post_calls.fetch_add(1, Ordering::SeqCst);
        let result = if self.fail.load(Ordering::SeqCst) {
            Err(AppError::persistence("post store unavailable"))
        } else {
            Ok(StoredPost {
                id: PostId::new(),
                author_id: ctx.user_id,
                payload: payload.clone(),
                created_at: chrono::Utc::now(),
            })
        };
        self.post_done.notify_one();
        result
    }

    async fn create_message(
        &self,
        message: &OutgoingMessage,
        ctx: &AuthContext,
    ) -> Result<StoredMessage, AppError> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::persistence("message store unavailable"));
        }
        Ok(StoredMessage {
            id: MessageId::new(),
            sender_id: ctx.user_id,
            recipient_id: message.recipient_id,
            content: message.content.clone(),
            created_at: chrono::Utc::now(),
        })
    }
}

/// Builds an engine wired to fresh mocks.
pub fn test_engine(allow_anonymous: bool) -> (RelayEngine, Arc<MockVerifier>, Arc<MockGateway>) {
    let verifier = Arc::new(MockVerifier::default());
    let gateway = Arc::new(MockGateway::default());
    let config = RelayConfig {
        allow_anonymous,
        ..RelayConfig::default()
    };
    let engine = RelayEngine::new(config, verifier.clone(), gateway.clone());
    (engine, verifier, gateway)
}

/// Connects a client through the controller, returning its handle and
/// outbound receiver.
pub async fn connect(
    engine: &RelayEngine,
    credential: &str,
) -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundEvent>) {
    let opened = engine
        .sessions
        .connect(Some(credential.to_string()))
        .await
        .expect("connect should succeed");
    (opened.handle, opened.events)
}

/// Drains every event currently queued for a connection.
pub fn drain(rx: &mut mpsc::Receiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Presence statuses broadcast for one user, in arrival order.
pub fn presence_updates_for(events: &[OutboundEvent], user_id: UserId) -> Vec<PresenceStatus> {
    events
        .iter()
        .filter_map(|event| match event {
            OutboundEvent::PresenceUpdate { user } if user.user_id == user_id => Some(user.status),
            _ => None,
        })
        .collect()
}
