//! Group membership registry.
//!
//! Membership is presence-scoped: a user is "in" a group for fanout
//! purposes only while they have at least one live connection. Joining
//! is driven by explicit join events; leaving happens wholesale when the
//! user's last connection closes.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use pulse_core::types::{GroupId, UserId};

use super::MemberProfile;

/// The two group kinds the relay fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// A community: a broad membership scope.
    Community,
    /// A channel: a conversation scope; carries typing indicators.
    Channel,
}

type GroupKey = (GroupKind, GroupId);

#[derive(Debug, Default)]
struct Inner {
    /// Group → member profiles keyed by user.
    groups: HashMap<GroupKey, HashMap<UserId, MemberProfile>>,
    /// Reverse index: user → groups they belong to.
    by_user: HashMap<UserId, HashSet<GroupKey>>,
}

/// Thread-safe registry of group memberships for both group kinds.
///
/// Every operation is a single critical section over both indexes, so a
/// disconnect sweep cannot interleave with a concurrent join for the
/// same user.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    inner: RwLock<Inner>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or refreshes a membership entry and returns the full
    /// member snapshot for the group, including the joiner.
    ///
    /// Re-joining an already-joined group refreshes the stored profile;
    /// the caller announces every join regardless, because a reconnect is
    /// indistinguishable from a fresh join at this layer.
    pub fn join(
        &self,
        kind: GroupKind,
        group_id: GroupId,
        profile: MemberProfile,
    ) -> Vec<MemberProfile> {
        let mut inner = self.inner.write();
        let key = (kind, group_id);

        inner
            .by_user
            .entry(profile.user_id)
            .or_default()
            .insert(key);

        let members = inner.groups.entry(key).or_default();
        members.insert(profile.user_id, profile);
        members.values().cloned().collect()
    }

    /// Removes the user from every group they belong to, in one atomic
    /// sweep. Returns the affected group identifiers so departures can
    /// be announced. Groups left empty are dropped.
    pub fn leave_all_for_user(&self, user_id: UserId) -> Vec<(GroupKind, GroupId)> {
        let mut inner = self.inner.write();

        let keys = inner.by_user.remove(&user_id).unwrap_or_default();
        let mut affected = Vec::with_capacity(keys.len());

        for key in keys {
            if let Some(members) = inner.groups.get_mut(&key) {
                if members.remove(&user_id).is_some() {
                    affected.push(key);
                }
                if members.is_empty() {
                    inner.groups.remove(&key);
                }
            }
        }

        affected
    }

    /// Member profile snapshot for a group. Empty for unknown groups.
    pub fn members_of(&self, kind: GroupKind, group_id: GroupId) -> Vec<MemberProfile> {
        self.inner
            .read()
            .groups
            .get(&(kind, group_id))
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// User ids of a group's members, for fanout resolution.
    pub fn member_user_ids(&self, kind: GroupKind, group_id: GroupId) -> Vec<UserId> {
        self.inner
            .read()
            .groups
            .get(&(kind, group_id))
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Number of groups with at least one member.
    pub fn group_count(&self) -> usize {
        self.inner.read().groups.len()
    }
}
