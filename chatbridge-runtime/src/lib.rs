//! # chatbridge runtime
//!
//! Everything in the bridge that runs: the event bindings for both networks,
//! the command bodies, the dispatcher, the periodic publisher and the
//! reconnect supervisor. State shared between them lives in one
//! [`BridgeContext`](context::BridgeContext).
//!
//! ```text
//!  game socket ──► supervisor ──► hooks ──► dispatch ──► commands
//!                      ▲                        │            │
//!                      │                        ▼            ▼
//!                   backoff              aggregator     game / group
//!                                            │
//!  group relay ──► hooks ──► dispatch        ▼
//!                                    periodic publisher ──► group sink
//! ```

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod commands;
pub mod context;
pub mod dispatch;
pub mod events;
pub mod format;
pub mod game;
pub mod hooks;
pub mod periodic;
pub mod scheduler;
pub mod supervisor;
pub mod tcp;

pub use context::BridgeContext;
pub use dispatch::DispatchOutcome;
pub use events::{GameEvent, GroupEvent, GroupMessageEvent};
pub use game::{GameConnector, GameHandle, GameSession};
pub use scheduler::Scheduler;
pub use supervisor::{LinkState, ReconnectSupervisor};
