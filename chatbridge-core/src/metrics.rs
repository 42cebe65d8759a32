//! Runtime counters.
//!
//! Lock-free `AtomicU64` counters bumped on the hot path and read on demand,
//! e.g. when the binary logs a summary at shutdown.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for dispatch, flush and connection events.
#[derive(Debug, Default)]
pub struct BridgeCounters {
    /// Lines classified as a known command.
    pub commands_classified: AtomicU64,
    /// Commands refused by the access gate.
    pub commands_denied: AtomicU64,
    /// Command bodies run.
    pub commands_executed: AtomicU64,
    /// Command bodies that returned an error.
    pub execution_failures: AtomicU64,
    /// Commands refused because another capture was in progress.
    pub capture_collisions: AtomicU64,
    /// Commands refused while the game connection was being re-established.
    pub refused_while_restarting: AtomicU64,
    /// Ambient and capture flushes that published something.
    pub flushes: AtomicU64,
    /// Publishes that failed.
    pub publish_failures: AtomicU64,
    /// Game connections re-established.
    pub reconnects: AtomicU64,
}

/// Point-in-time copy of [`BridgeCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// See [`BridgeCounters::commands_classified`].
    pub commands_classified: u64,
    /// See [`BridgeCounters::commands_denied`].
    pub commands_denied: u64,
    /// See [`BridgeCounters::commands_executed`].
    pub commands_executed: u64,
    /// See [`BridgeCounters::execution_failures`].
    pub execution_failures: u64,
    /// See [`BridgeCounters::capture_collisions`].
    pub capture_collisions: u64,
    /// See [`BridgeCounters::refused_while_restarting`].
    pub refused_while_restarting: u64,
    /// See [`BridgeCounters::flushes`].
    pub flushes: u64,
    /// See [`BridgeCounters::publish_failures`].
    pub publish_failures: u64,
    /// See [`BridgeCounters::reconnects`].
    pub reconnects: u64,
}

impl BridgeCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commands_classified: AtomicU64::new(0),
            commands_denied: AtomicU64::new(0),
            commands_executed: AtomicU64::new(0),
            execution_failures: AtomicU64::new(0),
            capture_collisions: AtomicU64::new(0),
            refused_while_restarting: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
        }
    }

    /// Increment one counter.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            commands_classified: self.commands_classified.load(Ordering::Relaxed),
            commands_denied: self.commands_denied.load(Ordering::Relaxed),
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            execution_failures: self.execution_failures.load(Ordering::Relaxed),
            capture_collisions: self.capture_collisions.load(Ordering::Relaxed),
            refused_while_restarting: self.refused_while_restarting.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}
