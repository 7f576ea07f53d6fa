//! Typing-state registry.
//!
//! Tracks which users are currently marked as typing per channel. An
//! entry must never outlive the user's last connection; the session
//! controller sweeps on final disconnect.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

use pulse_core::types::{ChannelId, UserId};

#[derive(Debug, Default)]
struct Inner {
    /// Channel → users currently typing in it.
    by_channel: HashMap<ChannelId, HashSet<UserId>>,
    /// Reverse index: user → channels they are typing in.
    by_user: HashMap<UserId, HashSet<ChannelId>>,
}

/// Thread-safe registry of typing indicators. Every operation is a
/// single critical section over both indexes.
#[derive(Debug, Default)]
pub struct TypingRegistry {
    inner: RwLock<Inner>,
}

impl TypingRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or removes the `(channel, user)` typing pair. Returns
    /// whether the state actually changed, so callers can skip redundant
    /// broadcasts when a client re-sends the same state.
    pub fn set_typing(&self, channel_id: ChannelId, user_id: UserId, is_typing: bool) -> bool {
        let mut inner = self.inner.write();

        let changed = if is_typing {
            let inserted = inner.by_channel.entry(channel_id).or_default().insert(user_id);
            if inserted {
                inner.by_user.entry(user_id).or_default().insert(channel_id);
            }
            inserted
        } else {
            let removed = inner
                .by_channel
                .get_mut(&channel_id)
                .is_some_and(|users| users.remove(&user_id));
            if removed {
                if inner.by_channel.get(&channel_id).is_some_and(HashSet::is_empty) {
                    inner.by_channel.remove(&channel_id);
                }
                if let Some(channels) = inner.by_user.get_mut(&user_id) {
                    channels.remove(&channel_id);
                    if channels.is_empty() {
                        inner.by_user.remove(&user_id);
                    }
                }
            }
            removed
        };

        changed
    }

    /// Removes every typing entry for the user, returning the affected
    /// channels so "stopped typing" can be announced.
    pub fn clear_all_for_user(&self, user_id: UserId) -> Vec<ChannelId> {
        let mut inner = self.inner.write();

        let channels = inner.by_user.remove(&user_id).unwrap_or_default();
        for channel_id in &channels {
            if let Some(users) = inner.by_channel.get_mut(channel_id) {
                users.remove(&user_id);
                if users.is_empty() {
                    inner.by_channel.remove(channel_id);
                }
            }
        }

        channels.into_iter().collect()
    }

    /// Users currently typing in a channel.
    pub fn typing_in(&self, channel_id: ChannelId) -> Vec<UserId> {
        self.inner
            .read()
            .by_channel
            .get(&channel_id)
            .map(|users| users.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_typing_is_idempotent() {
        let registry = TypingRegistry::new();
        let channel = ChannelId::new();
        let user = UserId::new();

        assert!(registry.set_typing(channel, user, true));
        assert!(!registry.set_typing(channel, user, true));

        assert!(registry.set_typing(channel, user, false));
        assert!(!registry.set_typing(channel, user, false));
    }

    #[test]
    fn test_clear_all_returns_affected_channels() {
        let registry = TypingRegistry::new();
        let user = UserId::new();
        let a = ChannelId::new();
        let b = ChannelId::new();

        registry.set_typing(a, user, true);
        registry.set_typing(b, user, true);

        let mut cleared = registry.clear_all_for_user(user);
        cleared.sort_by_key(ChannelId::to_string);
        let mut expected = vec![a, b];
        expected.sort_by_key(ChannelId::to_string);

        assert_eq!(cleared, expected);
        assert!(registry.typing_in(a).is_empty());
        assert!(registry.typing_in(b).is_empty());
    }

    #[test]
    fn test_clear_does_not_disturb_other_users() {
        let registry = TypingRegistry::new();
        let channel = ChannelId::new();
        let alice = UserId::new();
        let bob = UserId::new();

        registry.set_typing(channel, alice, true);
        registry.set_typing(channel, bob, true);

        registry.clear_all_for_user(alice);
        assert_eq!(registry.typing_in(channel), vec![bob]);
    }
}
