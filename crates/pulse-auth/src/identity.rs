//! Verified user identity.

use serde::{Deserialize, Serialize};

use pulse_core::types::UserId;

/// A verified user identity, immutable for the lifetime of a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// User id assigned by the identity service.
    pub id: UserId,
    /// Display name.
    pub display_name: String,
    /// Avatar URL, if the user has one.
    pub avatar_url: Option<String>,
}

impl Identity {
    /// The fallback identity for connections admitted without a
    /// credential. Only used when `relay.allow_anonymous` is enabled.
    pub fn guest(display_name: &str) -> Self {
        Self {
            id: UserId::guest(),
            display_name: display_name.to_string(),
            avatar_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_identity_uses_sentinel_id() {
        let identity = Identity::guest("guest");
        assert!(identity.id.is_guest());
        assert_eq!(identity.display_name, "guest");
        assert!(identity.avatar_url.is_none());
    }
}
