//! Command registry: the closed set of commands the bridge understands.
//!
//! Every command is a [`CommandKind`] variant with a static
//! [`CommandDescriptor`]. The registry maps `(origin, keyword)` to a kind once
//! at startup; after that the only string matching is the keyword lookup.

use std::collections::HashMap;

use crate::error::{BridgeError, Result};
use crate::types::Origin;

/// Static description of a command's gating and output behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    /// Keyword typed after the prefix.
    pub keyword: &'static str,
    /// Network the command is valid on.
    pub origin: Origin,
    /// Whether an argument string is mandatory.
    pub requires_args: bool,
    /// Usage hint shown when arguments are missing. `<>` required, `[]` optional.
    pub args_hint: &'static str,
    /// Whether the caller must be verified.
    pub requires_verification: bool,
    /// Whether the global shield suppresses this command.
    pub blocked_by_shield: bool,
    /// Whether only elevated group members may run it.
    pub requires_elevated_permission: bool,
    /// Whether a successful admission puts the caller on cooldown.
    pub applies_cooldown: bool,
    /// Whether game output produced after execution is captured into the reply.
    pub consumes_buffered_output: bool,
    /// Whether the reply is published after execution.
    pub publishes_reply: bool,
    /// Whether bot-authored group messages may trigger it.
    pub accepts_bot_authors: bool,
    /// One-line description for `help`.
    pub summary: &'static str,
}

impl CommandDescriptor {
    /// A verified, cooldown-bound command with no other special behaviour.
    const fn base(keyword: &'static str, origin: Origin, summary: &'static str) -> Self {
        Self {
            keyword,
            origin,
            requires_args: false,
            args_hint: "",
            requires_verification: true,
            blocked_by_shield: false,
            requires_elevated_permission: false,
            applies_cooldown: true,
            consumes_buffered_output: false,
            publishes_reply: true,
            accepts_bot_authors: false,
            summary,
        }
    }

    const fn args(mut self, hint: &'static str) -> Self {
        self.requires_args = true;
        self.args_hint = hint;
        self
    }

    const fn exempt(mut self) -> Self {
        self.requires_verification = false;
        self.applies_cooldown = false;
        self
    }

    const fn elevated(mut self) -> Self {
        self.requires_elevated_permission = true;
        self
    }

    const fn shielded(mut self) -> Self {
        self.blocked_by_shield = true;
        self
    }

    const fn captures(mut self) -> Self {
        self.consumes_buffered_output = true;
        self
    }

    const fn bots(mut self) -> Self {
        self.accepts_bot_authors = true;
        self
    }

    const fn silent(mut self) -> Self {
        self.publishes_reply = false;
        self
    }

    /// Usage line, e.g. `!verify <player>`.
    #[must_use]
    pub fn usage(&self, prefix: &str) -> String {
        if self.args_hint.is_empty() {
            format!("{prefix}{}", self.keyword)
        } else {
            format!("{prefix}{} {}", self.keyword, self.args_hint)
        }
    }
}

/// Every command the bridge can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Group: list available commands.
    Help,
    /// Group: start verification for a player name.
    Verify,
    /// Group: faction top, summarised.
    Ftop,
    /// Group: faction list, raw.
    Flist,
    /// Group: online players, raw.
    Online,
    /// Group: relay a line into game chat.
    Say,
    /// Group: toggle the shield.
    Shield,
    /// Group: bind the current channel to a destination name.
    SetChannel,
    /// Group: remove a member's verification.
    Unlink,
    /// Game: complete verification with the issued token.
    Token,
    /// Game: record a wall or buffer check.
    Checked,
}

impl CommandKind {
    /// All variants, in help order.
    pub const ALL: [CommandKind; 11] = [
        Self::Help,
        Self::Verify,
        Self::Ftop,
        Self::Flist,
        Self::Online,
        Self::Say,
        Self::Shield,
        Self::SetChannel,
        Self::Unlink,
        Self::Token,
        Self::Checked,
    ];

    /// The static descriptor of this command.
    #[must_use]
    pub const fn descriptor(self) -> CommandDescriptor {
        use Origin::{Game, Group};
        match self {
            Self::Help => CommandDescriptor::base("help", Group, "Show this list").exempt(),
            Self::Verify => CommandDescriptor::base("verify", Group, "Link your account to a player")
                .args("<player>")
                .exempt(),
            Self::Ftop => CommandDescriptor::base("ftop", Group, "Faction top values").captures().bots(),
            Self::Flist => CommandDescriptor::base("flist", Group, "Online factions").captures().bots(),
            Self::Online => CommandDescriptor::base("online", Group, "Players online").captures(),
            Self::Say => CommandDescriptor::base("say", Group, "Send a line to game chat")
                .args("<message>")
                .elevated()
                .captures(),
            Self::Shield => CommandDescriptor::base("shield", Group, "Toggle the shield")
                .args("<on|off>")
                .elevated(),
            Self::SetChannel => CommandDescriptor::base("setchannel", Group, "Bind this channel")
                .args("<serverchat|wallchecks|bufferchecks|ftop|flist>")
                .elevated(),
            Self::Unlink => CommandDescriptor::base("unlink", Group, "Remove a member's link")
                .args("<tag>")
                .elevated(),
            Self::Token => CommandDescriptor::base("token", Game, "Finish verification")
                .args("<token>")
                .exempt()
                .silent(),
            Self::Checked => CommandDescriptor::base("checked", Game, "Report a base check")
                .args("<walls|buffers>")
                .shielded()
                .silent(),
        }
    }
}

/// Lookup table from `(origin, keyword)` to command.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    entries: HashMap<Origin, HashMap<&'static str, CommandKind>>,
}

impl CommandRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in command.
    ///
    /// # Errors
    /// Returns `BridgeError::DuplicateCommand` if two built-ins collide.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        for kind in CommandKind::ALL {
            registry.register(kind)?;
        }
        Ok(registry)
    }

    /// Register one command.
    ///
    /// # Errors
    /// Returns `BridgeError::DuplicateCommand` if the keyword is taken for that origin.
    pub fn register(&mut self, kind: CommandKind) -> Result<()> {
        let descriptor = kind.descriptor();
        let by_keyword = self.entries.entry(descriptor.origin).or_default();
        if by_keyword.contains_key(descriptor.keyword) {
            return Err(BridgeError::DuplicateCommand {
                keyword: descriptor.keyword.to_string(),
                origin: descriptor.origin,
            });
        }
        by_keyword.insert(descriptor.keyword, kind);
        Ok(())
    }

    /// Resolve a lowercased keyword for an origin.
    #[must_use]
    pub fn lookup(&self, origin: Origin, keyword: &str) -> Option<CommandKind> {
        self.entries.get(&origin)?.get(keyword).copied()
    }

    /// Registered commands for an origin, in help order.
    #[must_use]
    pub fn commands(&self, origin: Origin) -> Vec<CommandKind> {
        CommandKind::ALL
            .into_iter()
            .filter(|kind| self.lookup(origin, kind.descriptor().keyword) == Some(*kind))
            .collect()
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
