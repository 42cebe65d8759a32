//! The bridge's shared state, owned in one place and passed explicitly.

use std::sync::Arc;

use chatbridge_core::aggregator::OutputAggregator;
use chatbridge_core::config::{BridgeConfig, Timings};
use chatbridge_core::connection::GroupSink;
use chatbridge_core::cooldown::CooldownSet;
use chatbridge_core::error::Result;
use chatbridge_core::gate::AccessGate;
use chatbridge_core::metrics::BridgeCounters;
use chatbridge_core::registry::CommandRegistry;
use chatbridge_core::store::AccountStore;
use chatbridge_core::types::{ChannelId, GroupMessage};
use tracing::{info, warn};

use crate::game::GameHandle;
use crate::scheduler::Scheduler;
use crate::supervisor::{LinkMonitor, LinkState};

/// Everything the event handlers, commands and timers share.
pub struct BridgeContext {
    /// Loaded configuration.
    pub config: BridgeConfig,
    /// Durations fixed at startup.
    pub timings: Timings,
    /// Built-in commands.
    pub registry: CommandRegistry,
    /// Verification, shield, argument, permission and cooldown checks.
    pub gate: AccessGate,
    /// Ambient and capture buffers.
    pub aggregator: Arc<OutputAggregator>,
    /// Account state.
    pub store: Arc<dyn AccountStore>,
    /// Group network publisher.
    pub group: Arc<dyn GroupSink>,
    /// Live game link.
    pub game: GameHandle,
    /// Connection lifecycle as seen by the supervisor.
    pub link: LinkMonitor,
    /// Operational counters.
    pub counters: BridgeCounters,
    /// Background tasks and the shutdown signal.
    pub scheduler: Scheduler,
}

impl std::fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeContext")
            .field("prefix", &self.config.general.prefix)
            .field("game", &self.game)
            .field("link", &self.link.state())
            .finish_non_exhaustive()
    }
}

impl BridgeContext {
    /// Assemble the context from its collaborators.
    ///
    /// Verifications left pending by an earlier run are dropped here, so a
    /// token issued before a crash cannot be redeemed after it.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, the built-in
    /// command table is inconsistent, or the store cannot be cleared.
    pub fn new(
        config: BridgeConfig,
        store: Arc<dyn AccountStore>,
        group: Arc<dyn GroupSink>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let timings = config.timings();
        let registry = CommandRegistry::builtin()?;
        let gate = AccessGate::new(Arc::clone(&store), CooldownSet::new(timings.cooldown));
        let stale = store.clear_temporary_state()?;
        if stale > 0 {
            info!(cleared = stale, "Stale verifications dropped");
        }
        info!(
            prefix = %config.general.prefix,
            commands = registry.len(),
            "Bridge context ready"
        );
        Ok(Arc::new(Self {
            config,
            timings,
            registry,
            gate,
            aggregator: Arc::new(OutputAggregator::new()),
            store,
            group,
            game: GameHandle::new(),
            link: LinkMonitor::new(),
            counters: BridgeCounters::new(),
            scheduler: Scheduler::new(),
        }))
    }

    /// Command prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.config.general.prefix
    }

    /// Publish, logging and counting a failure instead of returning it.
    pub async fn publish_logged(&self, channel: &ChannelId, message: &GroupMessage) -> bool {
        match self.group.publish(channel, message).await {
            Ok(()) => true,
            Err(e) => {
                BridgeCounters::bump(&self.counters.publish_failures);
                warn!(channel = %channel, error = %e, "Publish failed");
                false
            }
        }
    }

    /// Thumbnail URL for `player`, when an avatar service is configured.
    #[must_use]
    pub fn player_avatar(&self, player: &str) -> Option<String> {
        self.config.game.avatar_url.as_ref().map(|base| format!("{base}{player}"))
    }

    /// Say a line in game, logging a failure instead of returning it.
    pub fn say_logged(&self, text: &str) -> bool {
        match self.game.send_chat(text) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Game chat not sent");
                false
            }
        }
    }

    /// Stop every background task, then drop temporary verification state.
    pub async fn shutdown(&self) {
        info!("Shutting down bridge");
        self.scheduler.shutdown().await;
        self.link.set(LinkState::Disconnected);
        self.game.quit("shutting down");
        self.game.detach();
        match self.store.clear_temporary_state() {
            Ok(n) => info!(cleared = n, "Temporary verification state cleared"),
            Err(e) => warn!(error = %e, "Failed to clear temporary verification state"),
        }
        let counters = self.counters.snapshot();
        info!(?counters, "Bridge stopped");
    }
}
