//! Session state machine types.

use pulse_auth::Identity;

/// Lifecycle phases of a connection's session.
///
/// A session only exists once credential verification (or the guest
/// policy) has succeeded, so it is created already `Authenticated`; a
/// rejected credential never produces a session. Teardown removes the
/// session entry outright rather than parking it in a terminal phase.
/// Inbound events are only accepted while `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Identity verified, not yet registered for fanout.
    Authenticated,
    /// Registered and receiving/sending events.
    Active,
}

/// Per-connection session state held by the controller.
#[derive(Debug, Clone)]
pub struct Session {
    /// Verified (or guest) identity, immutable for the connection's
    /// lifetime.
    pub identity: Identity,
    /// The opaque credential presented at connect time, forwarded to the
    /// persistence API on writes.
    pub credential: Option<String>,
    /// Current lifecycle phase.
    pub phase: SessionPhase,
}
