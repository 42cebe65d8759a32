//! Periodic publisher: independent timers that publish to bound channels.
//!
//! Each task resolves its destination on every tick. An unbound destination
//! is a warning (and, for most tasks, an in-game notice), never an error.
//! Ticks missed while a tick runs are not caught up.

use std::sync::Arc;
use std::time::Duration;

use chatbridge_core::config::Timings;
use chatbridge_core::metrics::BridgeCounters;
use chatbridge_core::types::{
    ChannelId, CheckKind, GroupMessage, Reply, code_block, colors, destinations,
};
use chrono::Utc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::commands::capitalize;
use crate::context::BridgeContext;

/// The recurring jobs the bridge runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodicKind {
    /// Flush the ambient buffer.
    ServerChat,
    /// Report on wall checks.
    WallChecks,
    /// Report on buffer checks.
    BufferChecks,
    /// Post the faction top trigger.
    Ftop,
    /// Post the faction list trigger.
    Flist,
    /// Re-send the join command in game.
    Join,
}

impl PeriodicKind {
    /// Every task, in start order.
    pub const ALL: [PeriodicKind; 6] = [
        Self::ServerChat,
        Self::WallChecks,
        Self::BufferChecks,
        Self::Ftop,
        Self::Flist,
        Self::Join,
    ];

    /// Task name for logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ServerChat => "serverchat",
            Self::WallChecks => "wallchecks",
            Self::BufferChecks => "bufferchecks",
            Self::Ftop => "ftop",
            Self::Flist => "flist",
            Self::Join => "join",
        }
    }

    /// Destination binding the task publishes to.
    #[must_use]
    pub fn destination(self) -> Option<&'static str> {
        match self {
            Self::ServerChat => Some(destinations::SERVER_CHAT),
            Self::WallChecks => Some(destinations::WALL_CHECKS),
            Self::BufferChecks => Some(destinations::BUFFER_CHECKS),
            Self::Ftop => Some(destinations::FTOP),
            Self::Flist => Some(destinations::FLIST),
            Self::Join => None,
        }
    }

    /// Period of this task.
    #[must_use]
    pub fn period(self, timings: &Timings) -> Duration {
        match self {
            Self::ServerChat => timings.ambient_flush,
            Self::WallChecks => timings.wallcheck,
            Self::BufferChecks => timings.buffercheck,
            Self::Ftop => timings.ftop,
            Self::Flist => timings.flist,
            Self::Join => timings.join_command,
        }
    }

    /// In-game notice sent when the destination is unbound.
    #[must_use]
    pub fn missing_notice(self) -> Option<&'static str> {
        match self {
            Self::WallChecks => Some("Error: Wallcheck channel has not been setup"),
            Self::BufferChecks => Some("Error: Buffercheck channel has not been setup"),
            Self::Ftop => Some("Error: FactionTop channel has not been setup"),
            Self::Flist => Some("Error: FactionList channel has not been setup"),
            Self::ServerChat | Self::Join => None,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Something was published or sent.
    Published,
    /// Nothing to do this tick.
    Idle,
    /// Suppressed by the shield.
    Shielded,
    /// No channel bound to the destination.
    Unbound,
    /// Publishing or sending failed.
    Failed,
}

/// Start every periodic task as a scheduler service.
pub fn spawn_all(ctx: &Arc<BridgeContext>) {
    for kind in PeriodicKind::ALL {
        let period = kind.period(&ctx.timings);
        let task_ctx = Arc::clone(ctx);
        ctx.scheduler.spawn_service(kind.name(), async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let outcome = tick(&task_ctx, kind).await;
                debug!(task = kind.name(), ?outcome, "Periodic tick");
            }
        });
    }
}

/// Run one tick of `kind`.
pub async fn tick(ctx: &BridgeContext, kind: PeriodicKind) -> TickOutcome {
    match kind {
        PeriodicKind::ServerChat => flush_ambient(ctx).await,
        PeriodicKind::WallChecks => report_check(ctx, kind, CheckKind::Walls).await,
        PeriodicKind::BufferChecks => report_check(ctx, kind, CheckKind::Buffers).await,
        PeriodicKind::Ftop => post_trigger(ctx, kind, "ftop").await,
        PeriodicKind::Flist => post_trigger(ctx, kind, "flist").await,
        PeriodicKind::Join => {
            if ctx.say_logged(&ctx.config.game.join_command) {
                TickOutcome::Published
            } else {
                TickOutcome::Failed
            }
        }
    }
}

fn resolve(ctx: &BridgeContext, kind: PeriodicKind) -> Option<ChannelId> {
    let name = kind.destination()?;
    match ctx.store.resolve_destination(name) {
        Ok(Some(channel)) => Some(channel),
        Ok(None) => {
            warn!(task = kind.name(), destination = name, "Destination not bound");
            if let Some(notice) = kind.missing_notice() {
                ctx.say_logged(notice);
            }
            None
        }
        Err(e) => {
            warn!(task = kind.name(), error = %e, "Destination lookup failed");
            None
        }
    }
}

async fn publish(ctx: &BridgeContext, channel: &ChannelId, message: &GroupMessage) -> TickOutcome {
    if ctx.publish_logged(channel, message).await {
        TickOutcome::Published
    } else {
        TickOutcome::Failed
    }
}

/// Drain the ambient buffer into one batch. The buffer is cleared whether or
/// not the batch could be published.
async fn flush_ambient(ctx: &BridgeContext) -> TickOutcome {
    let lines = ctx.aggregator.take_ambient();
    if lines.is_empty() {
        return TickOutcome::Idle;
    }
    BridgeCounters::bump(&ctx.counters.flushes);
    let channel = match ctx.store.resolve_destination(destinations::SERVER_CHAT) {
        Ok(Some(channel)) => channel,
        Ok(None) => {
            warn!(dropped = lines.len(), "Server chat destination not bound");
            return TickOutcome::Unbound;
        }
        Err(e) => {
            warn!(error = %e, "Destination lookup failed");
            return TickOutcome::Failed;
        }
    };
    publish(ctx, &channel, &GroupMessage::text(code_block(&lines))).await
}

async fn report_check(ctx: &BridgeContext, kind: PeriodicKind, check: CheckKind) -> TickOutcome {
    match ctx.store.is_shield_active() {
        Ok(true) => return TickOutcome::Shielded,
        Ok(false) => {}
        Err(e) => {
            warn!(task = kind.name(), error = %e, "Shield lookup failed");
            return TickOutcome::Failed;
        }
    }
    let Some(channel) = resolve(ctx, kind) else {
        return TickOutcome::Unbound;
    };
    let last = match ctx.store.last_check(check) {
        Ok(last) => last,
        Err(e) => {
            warn!(task = kind.name(), error = %e, "Check lookup failed");
            return TickOutcome::Failed;
        }
    };

    let period = kind.period(&ctx.timings);
    let label = capitalize(check.as_str());
    let mut reply = Reply::now();
    reply.title = Some(format!("{label} check"));
    match last {
        Some(record) => {
            let elapsed = (Utc::now() - record.checked_at).to_std().unwrap_or_default();
            let minutes = elapsed.as_secs() / 60;
            let overdue = elapsed > period;
            reply.color = Some(if overdue { colors::ERROR } else { colors::INFO });
            reply.description = Some(format!(
                "{label} were last checked by **{}** {minutes} minute(s) ago",
                record.checked_by
            ));
            if overdue {
                ctx.say_logged(&format!(
                    "{label} have not been checked for {minutes} minute(s), type {}checked {check}",
                    ctx.prefix()
                ));
            }
        }
        None => {
            reply.color = Some(colors::ERROR);
            reply.description = Some(format!(
                "{label} have never been checked. Type `{}checked {check}` in game.",
                ctx.prefix()
            ));
        }
    }
    publish(ctx, &channel, &GroupMessage::Rich { reply }).await
}

/// Post `<prefix><keyword>` so the group-side command runs in that channel.
async fn post_trigger(ctx: &BridgeContext, kind: PeriodicKind, keyword: &str) -> TickOutcome {
    let Some(channel) = resolve(ctx, kind) else {
        return TickOutcome::Unbound;
    };
    publish(ctx, &channel, &GroupMessage::text(format!("{}{keyword}", ctx.prefix()))).await
}
