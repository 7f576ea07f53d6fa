//! Group (community/channel) membership tracking.

pub mod registry;

pub use registry::{GroupKind, GroupRegistry};

/// Membership entries carry the same shape as a presence summary:
/// display profile plus status and last-active timestamp.
pub type MemberProfile = crate::connection::UserPresence;
