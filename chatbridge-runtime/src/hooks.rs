//! Event bindings: what the bridge does with each network event.
//!
//! Bindings hold no state of their own. Reattaching them after a reconnect is
//! just routing the new connection's stream through [`handle_game_event`].

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::context::BridgeContext;
use crate::dispatch;
use crate::events::{GameEvent, GroupEvent};

/// Whether the game stream goes on after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading.
    Continue,
    /// The connection is finished.
    Terminal,
}

/// React to one game event.
pub async fn handle_game_event(ctx: &Arc<BridgeContext>, event: GameEvent) -> Flow {
    match event {
        GameEvent::Login => {
            let username = ctx.game.username().unwrap_or_default();
            info!(username = %username, host = %ctx.config.game.host, "Connected to game server");
            ctx.say_logged(&ctx.config.game.join_command);
        }
        GameEvent::ChatLine(line) => {
            debug!(line = %line, "Game chat");
            ctx.aggregator.push_line(&line);
        }
        GameEvent::PlayerChat { username, message } => {
            let outcome = dispatch::handle_game_chat(ctx, &username, &message).await;
            debug!(?outcome, player = %username, "Game message handled");
        }
        GameEvent::Death => {
            info!("Bot died, respawning");
            ctx.say_logged("/respawn");
        }
        GameEvent::Kicked { reason } => {
            warn!(reason = %reason, "Kicked from game server");
            ctx.game.quit(&reason);
        }
        GameEvent::Error(message) => error!(error = %message, "Game connection error"),
        GameEvent::End => return Flow::Terminal,
    }
    Flow::Continue
}

/// React to one group event.
pub async fn handle_group_event(ctx: &Arc<BridgeContext>, event: GroupEvent) {
    match event {
        GroupEvent::Message(msg) => {
            let outcome = dispatch::handle_group_message(ctx, &msg).await;
            debug!(?outcome, sender = %msg.tag, "Group message handled");
        }
        GroupEvent::MemberRemoved { tag } => match ctx.store.remove_user(&tag) {
            Ok(removed) => info!(tag = %tag, removed, "Member left the group"),
            Err(e) => error!(tag = %tag, error = %e, "Failed to remove departed member"),
        },
        GroupEvent::Ready { user } => info!(user = %user, "Group connection ready"),
    }
}
