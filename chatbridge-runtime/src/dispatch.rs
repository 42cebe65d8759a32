//! Command dispatch for both networks.
//!
//! classify → registry lookup → access gate → restart check → body → reply.
//!
//! Output-consuming commands take the capture before their body runs, so every
//! game line the body provokes lands in the capture buffer. The capture is
//! flushed by a deferred task at execution start plus the capture delay; the
//! event loop never sleeps.

use std::sync::Arc;

use chatbridge_core::classifier::{Classification, classify};
use chatbridge_core::gate::{AccessDecision, Caller};
use chatbridge_core::metrics::BridgeCounters;
use chatbridge_core::types::{ChannelId, GroupMessage, Origin, Reply, colors};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::commands::{self, Invocation};
use crate::context::BridgeContext;
use crate::events::GroupMessageEvent;
use crate::format::OutputFormat;

/// Reply sent when a capture is already running.
pub const CAPTURE_BUSY_TEXT: &str = "Another command is still collecting game output, try again in a moment";
/// Reply sent while the game connection is being re-established.
pub const RESTARTING_TEXT: &str = "The bot is restarting, try again in a few seconds";

/// What happened to one inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command, unknown keyword, or a filtered author.
    Ignored,
    /// The gate refused; the caller was told why where a reply channel exists.
    Denied(AccessDecision),
    /// Gate passed but the game connection is being re-established.
    Restarting,
    /// Gate passed but another capture is in progress.
    CaptureBusy,
    /// Body ran. Any capture flush is scheduled.
    Executed,
    /// Body or gate failed; logged, no reply sent.
    Failed,
}

/// Handle a message posted in a group channel.
pub async fn handle_group_message(ctx: &Arc<BridgeContext>, msg: &GroupMessageEvent) -> DispatchOutcome {
    if msg.direct {
        return DispatchOutcome::Ignored;
    }
    // No self filter on this side: the bot posts its own periodic triggers.
    let Classification::Classified(cmd) = classify(&msg.content, &msg.tag, "", ctx.prefix()) else {
        return DispatchOutcome::Ignored;
    };
    BridgeCounters::bump(&ctx.counters.commands_classified);

    let Some(kind) = ctx.registry.lookup(Origin::Group, &cmd.keyword) else {
        return DispatchOutcome::Ignored;
    };
    let descriptor = kind.descriptor();
    if msg.is_bot && !descriptor.accepts_bot_authors {
        return DispatchOutcome::Ignored;
    }

    let caller = Caller::member(&msg.tag, &msg.author_id, msg.elevated);
    let decision = match ctx.gate.evaluate(&descriptor, &cmd.args, &caller, ctx.prefix()) {
        Ok(decision) => decision,
        Err(e) => {
            error!(keyword = %cmd.keyword, error = %e, "Access check failed");
            return DispatchOutcome::Failed;
        }
    };
    if !decision.is_allowed() {
        BridgeCounters::bump(&ctx.counters.commands_denied);
        info!(keyword = %cmd.keyword, sender = %caller.identity, reason = decision.label(), "Command denied");
        if let Some(reply) = group_denial(&decision, &msg.author_id) {
            ctx.publish_logged(&msg.channel, &reply).await;
        }
        return DispatchOutcome::Denied(decision);
    }

    if !ctx.link.is_accepting() {
        BridgeCounters::bump(&ctx.counters.refused_while_restarting);
        ctx.publish_logged(&msg.channel, &GroupMessage::text(RESTARTING_TEXT)).await;
        return DispatchOutcome::Restarting;
    }

    let mut reply = Reply::now();
    reply.footer = Some(msg.tag.clone());
    let inv = Invocation {
        kind,
        args: &cmd.args,
        caller: &caller,
        channel: Some(&msg.channel),
    };
    run(ctx, &inv, reply, Some(msg.channel.clone())).await
}

/// Handle a chat message a player typed in game.
pub async fn handle_game_chat(ctx: &Arc<BridgeContext>, username: &str, message: &str) -> DispatchOutcome {
    let own = ctx.game.username().unwrap_or_else(|| ctx.config.game.username.clone());
    let Classification::Classified(cmd) = classify(message, username, &own, ctx.prefix()) else {
        return DispatchOutcome::Ignored;
    };
    BridgeCounters::bump(&ctx.counters.commands_classified);

    let Some(kind) = ctx.registry.lookup(Origin::Game, &cmd.keyword) else {
        return DispatchOutcome::Ignored;
    };
    let descriptor = kind.descriptor();

    let caller = Caller::player(username);
    let decision = match ctx.gate.evaluate(&descriptor, &cmd.args, &caller, ctx.prefix()) {
        Ok(decision) => decision,
        Err(e) => {
            error!(keyword = %cmd.keyword, error = %e, "Access check failed");
            return DispatchOutcome::Failed;
        }
    };
    if !decision.is_allowed() {
        BridgeCounters::bump(&ctx.counters.commands_denied);
        info!(keyword = %cmd.keyword, sender = %caller.identity, reason = decision.label(), "Command denied");
        if let Some(line) = game_denial(&decision) {
            ctx.say_logged(&line);
        }
        return DispatchOutcome::Denied(decision);
    }

    if !ctx.link.is_accepting() {
        BridgeCounters::bump(&ctx.counters.refused_while_restarting);
        return DispatchOutcome::Restarting;
    }

    let inv = Invocation {
        kind,
        args: &cmd.args,
        caller: &caller,
        channel: None,
    };
    run(ctx, &inv, Reply::now(), None).await
}

async fn run(
    ctx: &Arc<BridgeContext>,
    inv: &Invocation<'_>,
    mut reply: Reply,
    reply_channel: Option<ChannelId>,
) -> DispatchOutcome {
    let descriptor = inv.kind.descriptor();
    let started = Instant::now();

    let capture = match OutputFormat::for_command(inv.kind) {
        Some(format) => match ctx.aggregator.begin_capture() {
            Some(guard) => Some((guard, format)),
            None => {
                BridgeCounters::bump(&ctx.counters.capture_collisions);
                warn!(keyword = descriptor.keyword, "Capture in progress, command rejected");
                if let Some(channel) = &reply_channel {
                    ctx.publish_logged(channel, &GroupMessage::text(CAPTURE_BUSY_TEXT)).await;
                }
                return DispatchOutcome::CaptureBusy;
            }
        },
        None => None,
    };

    if let Err(e) = commands::execute(ctx, inv, &mut reply).await {
        BridgeCounters::bump(&ctx.counters.execution_failures);
        error!(keyword = descriptor.keyword, sender = %inv.caller.identity, error = %e, "Command failed");
        return DispatchOutcome::Failed;
    }
    BridgeCounters::bump(&ctx.counters.commands_executed);
    debug!(keyword = descriptor.keyword, sender = %inv.caller.identity, "Command executed");

    let channel = reply_channel.filter(|_| descriptor.publishes_reply);
    match capture {
        Some((guard, format)) => {
            let flush_ctx = Arc::clone(ctx);
            let keyword = descriptor.keyword;
            ctx.scheduler.defer_until(started + ctx.timings.capture_flush, async move {
                let lines = guard.finish();
                BridgeCounters::bump(&flush_ctx.counters.flushes);
                debug!(keyword, lines = lines.len(), "Capture flushed");
                format.apply(&lines, &mut reply);
                if let Some(channel) = channel {
                    flush_ctx.publish_logged(&channel, &GroupMessage::Rich { reply }).await;
                }
            });
        }
        None => {
            if let Some(channel) = channel {
                if !reply.is_empty() {
                    ctx.publish_logged(&channel, &GroupMessage::Rich { reply }).await;
                }
            }
        }
    }
    DispatchOutcome::Executed
}

/// Group-side message for a denial.
#[must_use]
pub fn group_denial(decision: &AccessDecision, author_id: &str) -> Option<GroupMessage> {
    let message = match decision {
        AccessDecision::Allowed => return None,
        AccessDecision::DeniedUnverified => {
            GroupMessage::text(format!("<@{author_id}>, You need to be verified to run that command"))
        }
        AccessDecision::DeniedCooldown => GroupMessage::text(format!("<@{author_id}>, You are in a cooldown")),
        AccessDecision::DeniedShielded => GroupMessage::text("Error: Shield is enabled."),
        AccessDecision::DeniedMissingArgs(usage) => {
            let mut reply = Reply::now()
                .with_color(colors::ERROR)
                .with_description(format!(
                    "⚠️ **Error** - `invalid arguments`\n\n**Syntax:**```{usage}```"
                ));
            reply.footer = Some("<> = required, [] = optional".into());
            GroupMessage::Rich { reply }
        }
        AccessDecision::DeniedInsufficientPermission => GroupMessage::Rich {
            reply: Reply::now()
                .with_color(colors::DENIED)
                .with_description("```❌ You do not have permissions to run this command```"),
        },
    };
    Some(message)
}

/// Game-side line for a denial; unverified players are not told.
#[must_use]
pub fn game_denial(decision: &AccessDecision) -> Option<String> {
    match decision {
        AccessDecision::DeniedShielded => Some("Error: Shield is enabled.".into()),
        AccessDecision::DeniedMissingArgs(usage) => Some(format!("Error: Wrong Syntax, type: {usage}")),
        _ => None,
    }
}
