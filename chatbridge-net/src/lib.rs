//! # chatbridge-net: group network client
//!
//! Publishes bridge output to the group network over its REST API:
//!   - plain text batches (ambient game chat)
//!   - rich replies (command results)
//!
//! Publishing is single-shot. A failed publish is reported to the caller,
//! which logs it and moves on; the buffers it came from are already cleared.

pub mod client;
pub mod error;
pub mod types;

pub use client::{GroupClient, GroupProvider};
pub use error::NetError;
pub use types::MessagePayload;
