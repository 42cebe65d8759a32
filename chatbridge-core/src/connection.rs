//! Outbound collaborator traits for the two networks.
//!
//! Inbound events and connection establishment live in the runtime crate;
//! these traits are what command bodies and flushes publish through.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChannelId, GroupMessage};

/// A live game connection's outbound half.
///
/// Sends are fire-and-forget: the connection queues the line and reports only
/// whether it could be queued.
pub trait GameLink: Send + Sync {
    /// Say a line in game chat (commands included, e.g. `/f top`).
    ///
    /// # Errors
    /// Returns `BridgeError::Connection` if the connection is closed.
    fn send_chat(&self, text: &str) -> Result<()>;

    /// Close the connection; the terminal event follows.
    fn quit(&self, reason: &str);

    /// The bot's own player name on this connection.
    fn username(&self) -> &str;
}

/// Publisher for the group network.
#[async_trait]
pub trait GroupSink: Send + Sync {
    /// Publish a message to a channel.
    ///
    /// # Errors
    /// Returns `BridgeError::Publish` if the destination is unreachable.
    async fn publish(&self, channel: &ChannelId, message: &GroupMessage) -> Result<()>;
}
