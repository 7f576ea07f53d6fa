//! Inbound and outbound event type definitions.
//!
//! Event names follow the hub's wire contract: inbound events use plain
//! camelCase names, outbound events use `scope:action` names.

use serde::{Deserialize, Serialize};

use pulse_core::types::{ChannelId, GroupId, UserId};
use pulse_gateway::types::StoredMessage;

use crate::connection::UserPresence;
use crate::membership::GroupKind;

/// Events sent by a client to the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundEvent {
    /// Join a community or channel.
    #[serde(rename = "joinGroup")]
    JoinGroup {
        /// Group kind.
        kind: GroupKind,
        /// Group id.
        group_id: GroupId,
    },
    /// Publish a post to everyone.
    #[serde(rename = "newPost")]
    NewPost {
        /// Arbitrary post payload, persisted as-is.
        payload: serde_json::Value,
    },
    /// Send a direct message to another user.
    #[serde(rename = "directMessage")]
    DirectMessage {
        /// Recipient user id.
        recipient_id: UserId,
        /// Message body.
        content: String,
    },
    /// Start or stop typing in a channel.
    #[serde(rename = "typing")]
    Typing {
        /// Channel id.
        channel_id: ChannelId,
        /// Whether the user is typing.
        is_typing: bool,
    },
}

/// Events sent by the hub to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    /// A user's presence changed (broadcast).
    #[serde(rename = "presence:update")]
    PresenceUpdate {
        /// Updated presence summary.
        user: UserPresence,
    },
    /// Snapshot of currently-online users, sent to a newly active
    /// connection so clients can rebuild state after reconnect.
    #[serde(rename = "presence:state")]
    PresenceState {
        /// Online users at the time of connect.
        users: Vec<UserPresence>,
    },
    /// A member joined a group (to the rest of the group).
    #[serde(rename = "group:memberJoined")]
    MemberJoined {
        /// Group kind.
        kind: GroupKind,
        /// Group id.
        group_id: GroupId,
        /// The joining member's profile.
        profile: UserPresence,
    },
    /// A member left a group (to the group).
    #[serde(rename = "group:memberLeft")]
    MemberLeft {
        /// Group kind.
        kind: GroupKind,
        /// Group id.
        group_id: GroupId,
        /// The departing user.
        user_id: UserId,
    },
    /// Full member snapshot, sent to the joiner only.
    #[serde(rename = "group:members")]
    GroupMembers {
        /// Group kind.
        kind: GroupKind,
        /// Group id.
        group_id: GroupId,
        /// Current members, including the joiner.
        members: Vec<UserPresence>,
    },
    /// A new post (broadcast, optimistic — emitted before persistence).
    #[serde(rename = "post:new")]
    PostNew {
        /// Posting user.
        author_id: UserId,
        /// Post payload as submitted.
        payload: serde_json::Value,
    },
    /// A direct message for the recipient (all their connections).
    #[serde(rename = "message:new")]
    MessageNew {
        /// The durably stored message.
        message: StoredMessage,
    },
    /// Acknowledgment to the sender's originating connection; carries
    /// the same stored payload as `message:new`.
    #[serde(rename = "message:sent")]
    MessageSent {
        /// The durably stored message.
        message: StoredMessage,
    },
    /// A user's typing state changed (to the channel).
    #[serde(rename = "typing:update")]
    TypingUpdate {
        /// Channel id.
        channel_id: ChannelId,
        /// Typing user.
        user_id: UserId,
        /// Whether the user is typing.
        is_typing: bool,
    },
    /// An error local to the receiving connection.
    #[serde(rename = "error")]
    Error {
        /// Stable error code.
        code: String,
        /// Human-readable description.
        message: String,
    },
}
