//! Shared domain types.

pub mod id;

pub use id::{ChannelId, ConnectionId, GroupId, MessageId, PostId, UserId};
