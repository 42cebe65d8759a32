//! # chatbridge core
//!
//! Network-agnostic half of the bridge between a game-world text channel and
//! a group-messaging channel. Neither network is named here: both sides are
//! reached through the collaborator traits in [`connection`] and the
//! [`AccountStore`](store::AccountStore).
//!
//! Inbound text flows through:
//!
//! ```text
//! raw line ──► classifier ──► registry lookup ──► access gate ──► command body
//!                                                                     │
//!                      game chat ──► output aggregator ◄──────────────┘
//!                                        │
//!                                        ▼
//!                              ambient / capture flush
//! ```
//!
//! The runtime crate owns the event loops, timers and command bodies; this
//! crate owns the state they share.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod connection;
pub mod cooldown;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod persistence;
pub mod registry;
pub mod store;
pub mod types;

pub use aggregator::{CaptureGuard, OutputAggregator, Routed};
pub use classifier::{Classification, ClassifiedCommand};
pub use config::BridgeConfig;
pub use connection::{GameLink, GroupSink};
pub use cooldown::CooldownSet;
pub use error::BridgeError;
pub use gate::{AccessDecision, AccessGate, Caller};
pub use metrics::BridgeCounters;
pub use persistence::SqliteAccountStore;
pub use registry::{CommandDescriptor, CommandKind, CommandRegistry};
pub use store::{AccountStore, MemoryAccountStore};
pub use types::*;
