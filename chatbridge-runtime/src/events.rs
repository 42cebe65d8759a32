//! Events delivered by the two networks.
//!
//! Game events arrive on one serial stream per connection; group events arrive
//! on the relay stream as newline-delimited JSON.

use chatbridge_core::types::ChannelId;
use serde::{Deserialize, Serialize};

/// Something that happened on the game connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    /// The bot finished logging in.
    Login,
    /// Any line of game chat, system messages included.
    ChatLine(String),
    /// A chat message authored by a player.
    PlayerChat {
        /// Author's player name.
        username: String,
        /// Message text without the name decoration.
        message: String,
    },
    /// The bot died.
    Death,
    /// The server removed the bot.
    Kicked {
        /// Reason given by the server.
        reason: String,
    },
    /// Non-fatal connection error.
    Error(String),
    /// The connection is gone for good.
    End,
}

/// A message posted in a group channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMessageEvent {
    /// Stable author id; keys the cooldown set.
    pub author_id: String,
    /// Author's display tag; keys verification.
    pub tag: String,
    /// Whether the author is a bot account.
    #[serde(default)]
    pub is_bot: bool,
    /// Whether the author holds administrator rights in the guild.
    #[serde(default)]
    pub elevated: bool,
    /// Whether the message came through a direct-message channel.
    #[serde(default)]
    pub direct: bool,
    /// Channel the message was posted in.
    pub channel: ChannelId,
    /// Raw message text.
    pub content: String,
}

/// Something that happened on the group network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GroupEvent {
    /// A message was posted.
    Message(GroupMessageEvent),
    /// A member left the guild.
    MemberRemoved {
        /// Tag of the departed member.
        tag: String,
    },
    /// The group connection is ready.
    Ready {
        /// The bot's own tag.
        #[serde(default)]
        user: String,
    },
}
