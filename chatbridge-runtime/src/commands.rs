//! Bodies of the built-in commands.
//!
//! A body runs only after the access gate allowed it. It talks to the game
//! through the context's handle, to the account store directly, and fills in
//! the reply that the dispatcher may publish afterwards.

use chatbridge_core::error::{BridgeError, Result};
use chatbridge_core::gate::Caller;
use chatbridge_core::registry::CommandKind;
use chatbridge_core::types::{ChannelId, CheckKind, GroupMessage, Origin, Reply, colors, destinations};
use chrono::Utc;
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::info;

use crate::context::BridgeContext;

/// Game command listing faction values.
pub const FTOP_COMMAND: &str = "/f top";
/// Game command listing factions.
pub const FLIST_COMMAND: &str = "/f list";
/// Game command listing online players.
pub const ONLINE_COMMAND: &str = "/list";

const TOKEN_LEN: usize = 8;

/// One command call after gating.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Which command.
    pub kind: CommandKind,
    /// Argument string, possibly empty.
    pub args: &'a str,
    /// Who called it.
    pub caller: &'a Caller,
    /// Group channel the call came from, if any.
    pub channel: Option<&'a ChannelId>,
}

impl Invocation<'_> {
    fn failed(&self, reason: impl Into<String>) -> BridgeError {
        BridgeError::Execution {
            keyword: self.kind.descriptor().keyword.to_string(),
            reason: reason.into(),
        }
    }
}

/// Run a command body.
///
/// # Errors
/// Returns `BridgeError::Execution` when the body cannot do its job, or the
/// underlying store or connection error.
pub async fn execute(ctx: &BridgeContext, inv: &Invocation<'_>, reply: &mut Reply) -> Result<()> {
    match inv.kind {
        CommandKind::Help => {
            help(ctx, reply);
            Ok(())
        }
        CommandKind::Verify => verify(ctx, inv, reply),
        CommandKind::Ftop => relay(ctx, FTOP_COMMAND, reply, "Faction Top"),
        CommandKind::Flist => relay(ctx, FLIST_COMMAND, reply, "Faction List"),
        CommandKind::Online => relay(ctx, ONLINE_COMMAND, reply, "Online Players"),
        CommandKind::Say => relay(ctx, inv.args.trim(), reply, "Game Output"),
        CommandKind::Shield => shield(ctx, inv, reply),
        CommandKind::SetChannel => set_channel(ctx, inv, reply),
        CommandKind::Unlink => unlink(ctx, inv, reply),
        CommandKind::Token => token(ctx, inv),
        CommandKind::Checked => checked(ctx, inv).await,
    }
}

fn help(ctx: &BridgeContext, reply: &mut Reply) {
    reply.title = Some("Commands".into());
    reply.color = Some(colors::INFO);
    for kind in ctx.registry.commands(Origin::Group) {
        let d = kind.descriptor();
        reply.push_field(d.usage(ctx.prefix()), d.summary, false);
    }
    let game: Vec<String> = ctx
        .registry
        .commands(Origin::Game)
        .into_iter()
        .map(|kind| kind.descriptor().usage(ctx.prefix()))
        .collect();
    if !game.is_empty() {
        reply.push_field("In game", game.join("\n"), false);
    }
    reply.footer = Some("<> = required, [] = optional".into());
}

/// Whether `name` looks like a player name: 3 to 16 letters, digits or underscores.
#[must_use]
pub fn is_valid_player_name(name: &str) -> bool {
    (3..=16).contains(&name.len()) && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn new_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn verify(ctx: &BridgeContext, inv: &Invocation<'_>, reply: &mut Reply) -> Result<()> {
    let player = inv.args.split_whitespace().next().unwrap_or_default();
    if !is_valid_player_name(player) {
        reply.color = Some(colors::ERROR);
        reply.description = Some(format!("`{player}` is not a valid player name"));
        return Ok(());
    }

    let tag = &inv.caller.identity.name;
    let token = new_token();
    ctx.store.begin_verification(tag, player, &token)?;
    ctx.game.send_chat(&format!(
        "/msg {player} Type {prefix}token {token} to link {tag}",
        prefix = ctx.prefix()
    ))?;
    info!(tag = %tag, player = %player, "Verification started");

    reply.color = Some(colors::INFO);
    reply.description = Some(format!(
        "A token was whispered to **{player}** in game. Type `{}token <token>` in game to finish.",
        ctx.prefix()
    ));
    Ok(())
}

/// Send a game command whose output the capture collects.
fn relay(ctx: &BridgeContext, line: &str, reply: &mut Reply, title: &str) -> Result<()> {
    ctx.game.send_chat(line)?;
    reply.title = Some(title.to_string());
    reply.color = Some(colors::INFO);
    Ok(())
}

fn shield(ctx: &BridgeContext, inv: &Invocation<'_>, reply: &mut Reply) -> Result<()> {
    let active = match inv.args.trim().to_ascii_lowercase().as_str() {
        "on" | "enable" | "true" => true,
        "off" | "disable" | "false" => false,
        _ => {
            reply.color = Some(colors::ERROR);
            reply.description = Some(format!(
                "Syntax: `{}`",
                inv.kind.descriptor().usage(ctx.prefix())
            ));
            return Ok(());
        }
    };
    ctx.store.set_shield(active)?;
    info!(active, by = %inv.caller.identity, "Shield toggled");
    reply.color = Some(colors::INFO);
    reply.description = Some(format!("Shield is now **{}**", if active { "on" } else { "off" }));
    Ok(())
}

fn set_channel(ctx: &BridgeContext, inv: &Invocation<'_>, reply: &mut Reply) -> Result<()> {
    let channel = inv.channel.ok_or_else(|| inv.failed("no channel to bind"))?;
    let name = inv.args.trim().to_ascii_lowercase();
    if !destinations::ALL.contains(&name.as_str()) {
        reply.color = Some(colors::ERROR);
        reply.description = Some(format!(
            "Unknown channel `{name}`. Syntax: `{}`",
            inv.kind.descriptor().usage(ctx.prefix())
        ));
        return Ok(());
    }
    ctx.store.bind_destination(&name, channel)?;
    info!(destination = %name, channel = %channel, "Destination bound");
    reply.color = Some(colors::INFO);
    reply.description = Some(format!("This channel now receives `{name}`"));
    Ok(())
}

fn unlink(ctx: &BridgeContext, inv: &Invocation<'_>, reply: &mut Reply) -> Result<()> {
    let tag = inv.args.trim();
    let removed = ctx.store.remove_user(tag)?;
    reply.color = Some(colors::INFO);
    reply.description = Some(if removed {
        format!("Unlinked **{tag}**")
    } else {
        format!("**{tag}** was not linked")
    });
    Ok(())
}

fn token(ctx: &BridgeContext, inv: &Invocation<'_>) -> Result<()> {
    let player = &inv.caller.identity.name;
    let token = inv.args.split_whitespace().next().unwrap_or_default();
    match ctx.store.complete_verification(player, token)? {
        Some(tag) => {
            info!(tag = %tag, player = %player, "Verification completed");
            ctx.game.send_chat(&format!("/msg {player} Linked to {tag}"))
        }
        None => ctx.game.send_chat(&format!("/msg {player} Invalid or expired token")),
    }
}

async fn checked(ctx: &BridgeContext, inv: &Invocation<'_>) -> Result<()> {
    let player = &inv.caller.identity.name;
    let Some(kind) = CheckKind::parse(inv.args) else {
        return ctx.game.send_chat(&format!(
            "Error: Wrong Syntax, type: {}",
            inv.kind.descriptor().usage(ctx.prefix())
        ));
    };
    let now = Utc::now();
    ctx.store.record_check(kind, player, now)?;
    ctx.game
        .send_chat(&format!("{} marked as checked by {player}", capitalize(kind.as_str())))?;

    if let Some(channel) = ctx.store.resolve_destination(kind.destination())? {
        let mut announcement = Reply::now().with_color(colors::INFO);
        announcement.title = Some(format!("{} checked", capitalize(kind.as_str())));
        announcement.description = Some(format!("**{player}** checked the {kind}"));
        announcement.thumbnail = ctx.player_avatar(player);
        ctx.publish_logged(&channel, &GroupMessage::Rich { reply: announcement }).await;
    }
    Ok(())
}

pub(crate) fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_names_validated() {
        assert!(is_valid_player_name("Alice_01"));
        assert!(!is_valid_player_name("al"));
        assert!(!is_valid_player_name("x".repeat(17).as_str()));
        assert!(!is_valid_player_name("bob /op"));
    }

    #[test]
    fn tokens_are_alphanumeric() {
        let token = new_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn capitalize_first_letter() {
        assert_eq!(capitalize("walls"), "Walls");
        assert_eq!(capitalize(""), "");
    }
}
