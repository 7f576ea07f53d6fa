//! Wire types exchanged with the persistence API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulse_core::types::{MessageId, PostId, UserId};

/// Identity context attached to persistence writes so the API can
/// attribute the record. The relay forwards the original credential
/// untouched; it never mints its own.
#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    /// Authenticated user performing the write.
    pub user_id: UserId,
    /// Opaque credential presented at connect time, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// A direct message before it has been durably stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Recipient user id.
    pub recipient_id: UserId,
    /// Message body.
    pub content: String,
}

/// Canonical stored representation of a post, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPost {
    /// Durable post id.
    pub id: PostId,
    /// Author user id.
    pub author_id: UserId,
    /// Stored payload.
    pub payload: serde_json::Value,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Canonical stored representation of a direct message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Durable message id.
    pub id: MessageId,
    /// Sender user id.
    pub sender_id: UserId,
    /// Recipient user id.
    pub recipient_id: UserId,
    /// Message body.
    pub content: String,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}
