//! Per-caller command cooldowns.
//!
//! Entries are created on admission and destroyed once their TTL runs out;
//! there is no manual eviction. Every admission sweeps expired entries, so the
//! map holds at most the callers admitted within the last TTL. Expiry is
//! evaluated against `tokio::time::Instant`, so paused-clock tests advance it
//! deterministically.

use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;

/// Set of throttled caller identifiers with a fixed time-to-live.
#[derive(Debug)]
pub struct CooldownSet {
    ttl: Duration,
    expires_at: DashMap<String, Instant>,
}

impl CooldownSet {
    /// Create an empty set whose entries live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            expires_at: DashMap::new(),
        }
    }

    /// Admit `key` if it is not currently throttled.
    ///
    /// Returns `false` while an earlier admission is still live; a rejected
    /// attempt does not extend the existing entry.
    pub fn try_admit(&self, key: &str) -> bool {
        let now = Instant::now();
        self.sweep(now);
        match self.expires_at.entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(now + self.ttl);
                true
            }
        }
    }

    /// Whether `key` is currently throttled.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.expires_at.get(key).is_some_and(|expiry| *expiry > now)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sweep(Instant::now());
        self.expires_at.len()
    }

    /// Whether no caller is throttled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(&self, now: Instant) {
        self.expires_at.retain(|_, expiry| *expiry > now);
    }
}
