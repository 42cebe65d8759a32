//! Reconnect supervisor for the game connection.
//!
//! ```text
//! Connected ──end──► Disconnected ──► Reconnecting ──backoff, connect──► Connected
//! ```
//!
//! Commands are only executed while `Connected`. A reconnect clears temporary
//! verification state before the new link is published.

use std::sync::Arc;

use chatbridge_core::metrics::BridgeCounters;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::context::BridgeContext;
use crate::game::GameConnector;
use crate::hooks::{self, Flow};
use crate::scheduler::shutdown_requested;

/// Lifecycle of the game connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Live connection; commands execute.
    Connected,
    /// No connection and no attempt pending yet.
    Disconnected,
    /// Waiting out the backoff or connecting.
    Reconnecting,
}

/// Observable link state.
#[derive(Debug)]
pub struct LinkMonitor {
    tx: watch::Sender<LinkState>,
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkMonitor {
    /// Monitor starting `Disconnected`.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LinkState::Disconnected);
        Self { tx }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        *self.tx.borrow()
    }

    /// Move to `state`.
    pub fn set(&self, state: LinkState) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            info!(from = ?previous, to = ?state, "Game link state changed");
        }
    }

    /// Whether commands may execute.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Receiver for state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.tx.subscribe()
    }
}

/// Keeps a game connection alive for the life of the bridge.
pub struct ReconnectSupervisor {
    ctx: Arc<BridgeContext>,
    connector: Arc<dyn GameConnector>,
}

impl ReconnectSupervisor {
    /// Supervisor over `connector`.
    #[must_use]
    pub fn new(ctx: Arc<BridgeContext>, connector: Arc<dyn GameConnector>) -> Self {
        Self { ctx, connector }
    }

    /// Register the supervisor as a scheduler service.
    pub fn spawn(self) {
        let ctx = Arc::clone(&self.ctx);
        ctx.scheduler.spawn_service("reconnect-supervisor", self.run());
    }

    /// Connect, pump events until the connection ends, back off, repeat.
    /// Returns only on shutdown.
    pub async fn run(self) {
        let ctx = self.ctx;
        let mut shutdown = ctx.scheduler.subscribe();
        let mut reconnecting = false;

        loop {
            if reconnecting {
                ctx.link.set(LinkState::Reconnecting);
                info!(backoff_secs = ctx.timings.reconnect_backoff.as_secs(), "Bot is restarting");
                tokio::select! {
                    () = tokio::time::sleep(ctx.timings.reconnect_backoff) => {}
                    () = shutdown_requested(&mut shutdown) => return,
                }
            }

            let session = tokio::select! {
                result = self.connector.connect() => result,
                () = shutdown_requested(&mut shutdown) => return,
            };
            let mut session = match session {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "Game connection attempt failed");
                    reconnecting = true;
                    continue;
                }
            };

            if reconnecting {
                match ctx.store.clear_temporary_state() {
                    Ok(n) => info!(cleared = n, "Temporary verification state cleared"),
                    Err(e) => warn!(error = %e, "Failed to clear temporary verification state"),
                }
                BridgeCounters::bump(&ctx.counters.reconnects);
            }
            ctx.game.attach(Arc::clone(&session.link));
            ctx.link.set(LinkState::Connected);

            loop {
                let event = tokio::select! {
                    event = session.events.recv() => event,
                    () = shutdown_requested(&mut shutdown) => {
                        session.link.quit("shutting down");
                        ctx.game.detach();
                        ctx.link.set(LinkState::Disconnected);
                        return;
                    }
                };
                let Some(event) = event else { break };
                if hooks::handle_game_event(&ctx, event).await == Flow::Terminal {
                    break;
                }
            }

            warn!("Game connection ended");
            ctx.game.detach();
            ctx.link.set(LinkState::Disconnected);
            reconnecting = true;
        }
    }
}
