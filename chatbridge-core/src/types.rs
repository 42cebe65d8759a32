//! Shared value types: origins, identities, channels, replies.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which network a command or message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The game-world text channel.
    Game,
    /// The group-messaging channel (the privileged context).
    Group,
}

impl Origin {
    /// Whether this origin is the privileged context where permission and
    /// cooldown checks apply.
    #[must_use]
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Group)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game => f.write_str("game"),
            Self::Group => f.write_str("group"),
        }
    }
}

/// A user as seen by one network: a player name in game, a member tag in the group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Network the name belongs to.
    pub origin: Origin,
    /// Player name or member tag.
    pub name: String,
}

impl Identity {
    /// A game-side player.
    #[must_use]
    pub fn player(name: impl Into<String>) -> Self {
        Self { origin: Origin::Game, name: name.into() }
    }

    /// A group-side member.
    #[must_use]
    pub fn member(tag: impl Into<String>) -> Self {
        Self { origin: Origin::Group, name: tag.into() }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.name)
    }
}

/// Opaque identifier of a group-network channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub String);

impl ChannelId {
    /// Wrap a raw channel identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named destination bindings the bridge resolves through the account store.
pub mod destinations {
    /// Ambient game chat batches.
    pub const SERVER_CHAT: &str = "serverchat";
    /// Wall check reports.
    pub const WALL_CHECKS: &str = "wallchecks";
    /// Buffer check reports.
    pub const BUFFER_CHECKS: &str = "bufferchecks";
    /// Periodic faction top trigger.
    pub const FTOP: &str = "ftop";
    /// Periodic faction list trigger.
    pub const FLIST: &str = "flist";

    /// Every name `setchannel` accepts.
    pub const ALL: [&str; 5] = [SERVER_CHAT, WALL_CHECKS, BUFFER_CHECKS, FTOP, FLIST];
}

/// Periodic base checks that players record in game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    /// Faction walls.
    Walls,
    /// Faction buffers.
    Buffers,
}

impl CheckKind {
    /// Parse the argument of the `checked` command.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "walls" | "wall" => Some(Self::Walls),
            "buffers" | "buffer" => Some(Self::Buffers),
            _ => None,
        }
    }

    /// Stable storage key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Walls => "walls",
            Self::Buffers => "buffers",
        }
    }

    /// Destination binding the check reports go to.
    #[must_use]
    pub fn destination(self) -> &'static str {
        match self {
            Self::Walls => destinations::WALL_CHECKS,
            Self::Buffers => destinations::BUFFER_CHECKS,
        }
    }
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last recorded base check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRecord {
    /// Which check.
    pub kind: CheckKind,
    /// Player who reported it.
    pub checked_by: String,
    /// When it was reported.
    pub checked_at: DateTime<Utc>,
}

/// Reply colours used by the built-in commands.
pub mod colors {
    /// Error and syntax replies.
    pub const ERROR: u32 = 0x00f9_3a2f;
    /// Permission denials.
    pub const DENIED: u32 = 0x007a_2f8f;
    /// Normal replies.
    pub const INFO: u32 = 0x0034_98db;
}

/// A rich reply destined for the group network.
///
/// Commands fill one of these in; the runtime decides whether and where it is
/// published.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Optional title line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Main body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accent colour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    /// Name/value fields, rendered in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ReplyField>,
    /// Footer text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    /// Small image shown beside the body, e.g. a player avatar.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Timestamp shown with the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// One name/value pair inside a [`Reply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyField {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: String,
    /// Render side by side with neighbouring inline fields.
    #[serde(default)]
    pub inline: bool,
}

impl Reply {
    /// A reply stamped with the current time.
    #[must_use]
    pub fn now() -> Self {
        Self { timestamp: Some(Utc::now()), ..Self::default() }
    }

    /// Set the body text.
    #[must_use]
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Set the accent colour.
    #[must_use]
    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    /// Append a field.
    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) {
        self.fields.push(ReplyField { name: name.into(), value: value.into(), inline });
    }

    /// Whether the reply carries anything worth publishing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.fields.is_empty()
    }
}

/// What gets published to a group channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GroupMessage {
    /// Plain text.
    Text {
        /// Message text.
        content: String,
    },
    /// Rich reply.
    Rich {
        /// Reply body.
        reply: Reply,
    },
}

impl GroupMessage {
    /// Plain text message.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text { content: content.into() }
    }
}

/// Wrap lines in a fenced block the way the bridge renders raw game output.
#[must_use]
pub fn code_block(lines: &[String]) -> String {
    format!("```{}```", lines.join("\n"))
}
