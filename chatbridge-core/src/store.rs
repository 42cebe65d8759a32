//! Account store: verification state, shield flag, channel bindings.
//!
//! The bridge only ever asks the store narrow questions. [`MemoryAccountStore`]
//! backs tests; [`SqliteAccountStore`](crate::persistence::SqliteAccountStore)
//! backs the running bridge.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::Result;
use crate::types::{ChannelId, CheckKind, CheckRecord, Identity, Origin};

/// Operations the bridge performs against persisted account state.
///
/// A user row links a group member tag to a player name. It is *temporary*
/// until the player confirms the token in game; temporary rows are dropped by
/// [`clear_temporary_state`](AccountStore::clear_temporary_state).
pub trait AccountStore: Send + Sync {
    /// Whether `who` is verified. Game identities match on player name, group
    /// identities on member tag.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    fn is_verified(&self, who: &Identity) -> Result<bool>;

    /// Whether the global shield is on.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    fn is_shield_active(&self) -> Result<bool>;

    /// Turn the global shield on or off.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    fn set_shield(&self, active: bool) -> Result<()>;

    /// Channel bound to a destination name, if any.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    fn resolve_destination(&self, name: &str) -> Result<Option<ChannelId>>;

    /// Bind a destination name to a channel, replacing any earlier binding.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    fn bind_destination(&self, name: &str, channel: &ChannelId) -> Result<()>;

    /// Record a pending link between `tag` and `player` guarded by `token`.
    /// Replaces any earlier pending or verified link for `tag`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    fn begin_verification(&self, tag: &str, player: &str, token: &str) -> Result<()>;

    /// Confirm a pending link. Returns the member tag on success, `None` when
    /// no pending link for `player` carries `token`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    fn complete_verification(&self, player: &str, token: &str) -> Result<Option<String>>;

    /// Drop every temporary (unconfirmed) link. Returns how many were dropped.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    fn clear_temporary_state(&self) -> Result<usize>;

    /// Forget a member entirely. Returns whether anything was removed.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    fn remove_user(&self, tag: &str) -> Result<bool>;

    /// Record that `by` performed a base check at `at`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    fn record_check(&self, kind: CheckKind, by: &str, at: DateTime<Utc>) -> Result<()>;

    /// Most recent base check of a kind.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    fn last_check(&self, kind: CheckKind) -> Result<Option<CheckRecord>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct UserRow {
    player: String,
    token: String,
    verified: bool,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, UserRow>,
    shield: bool,
    channels: HashMap<String, ChannelId>,
    checks: HashMap<CheckKind, CheckRecord>,
}

/// Process-local account store.
#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    state: Mutex<MemoryState>,
}

impl MemoryAccountStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an already verified link.
    pub fn insert_verified(&self, tag: &str, player: &str) {
        self.state.lock().users.insert(
            tag.to_string(),
            UserRow {
                player: player.to_string(),
                token: String::new(),
                verified: true,
            },
        );
    }

    /// Number of links, temporary or not.
    #[must_use]
    pub fn user_count(&self) -> usize {
        self.state.lock().users.len()
    }
}

impl AccountStore for MemoryAccountStore {
    fn is_verified(&self, who: &Identity) -> Result<bool> {
        let state = self.state.lock();
        let verified = match who.origin {
            Origin::Group => state.users.get(&who.name).is_some_and(|u| u.verified),
            Origin::Game => state
                .users
                .values()
                .any(|u| u.verified && u.player.eq_ignore_ascii_case(&who.name)),
        };
        Ok(verified)
    }

    fn is_shield_active(&self) -> Result<bool> {
        Ok(self.state.lock().shield)
    }

    fn set_shield(&self, active: bool) -> Result<()> {
        self.state.lock().shield = active;
        Ok(())
    }

    fn resolve_destination(&self, name: &str) -> Result<Option<ChannelId>> {
        Ok(self.state.lock().channels.get(name).cloned())
    }

    fn bind_destination(&self, name: &str, channel: &ChannelId) -> Result<()> {
        self.state.lock().channels.insert(name.to_string(), channel.clone());
        Ok(())
    }

    fn begin_verification(&self, tag: &str, player: &str, token: &str) -> Result<()> {
        self.state.lock().users.insert(
            tag.to_string(),
            UserRow {
                player: player.to_string(),
                token: token.to_string(),
                verified: false,
            },
        );
        Ok(())
    }

    fn complete_verification(&self, player: &str, token: &str) -> Result<Option<String>> {
        let mut state = self.state.lock();
        let found = state.users.iter_mut().find(|(_, u)| {
            !u.verified && u.player.eq_ignore_ascii_case(player) && u.token == token
        });
        Ok(found.map(|(tag, row)| {
            row.verified = true;
            row.token.clear();
            tag.clone()
        }))
    }

    fn clear_temporary_state(&self) -> Result<usize> {
        let mut state = self.state.lock();
        let before = state.users.len();
        state.users.retain(|_, u| u.verified);
        Ok(before - state.users.len())
    }

    fn remove_user(&self, tag: &str) -> Result<bool> {
        Ok(self.state.lock().users.remove(tag).is_some())
    }

    fn record_check(&self, kind: CheckKind, by: &str, at: DateTime<Utc>) -> Result<()> {
        self.state.lock().checks.insert(
            kind,
            CheckRecord {
                kind,
                checked_by: by.to_string(),
                checked_at: at,
            },
        );
        Ok(())
    }

    fn last_check(&self, kind: CheckKind) -> Result<Option<CheckRecord>> {
        Ok(self.state.lock().checks.get(&kind).cloned())
    }
}
