//! Swappable handle to the current game connection.
//!
//! The supervisor replaces the link on every reconnect. Everything else holds
//! the [`GameHandle`] and looks the link up per call, so a swap needs no
//! restart of the dependents.

use std::sync::Arc;

use async_trait::async_trait;
use chatbridge_core::connection::GameLink;
use chatbridge_core::error::{BridgeError, Result};
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::events::GameEvent;

/// A freshly established game connection.
pub struct GameSession {
    /// Outbound half.
    pub link: Arc<dyn GameLink>,
    /// Inbound event stream. Ends with [`GameEvent::End`] or by closing.
    pub events: mpsc::Receiver<GameEvent>,
}

/// Establishes game connections for the supervisor.
#[async_trait]
pub trait GameConnector: Send + Sync {
    /// Open a new connection.
    ///
    /// # Errors
    /// Returns `BridgeError::Connection` if the server cannot be reached.
    async fn connect(&self) -> Result<GameSession>;
}

/// Shared slot holding the live link, if any.
#[derive(Default)]
pub struct GameHandle {
    link: RwLock<Option<Arc<dyn GameLink>>>,
}

impl std::fmt::Debug for GameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl GameHandle {
    /// Empty handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new link, returning the previous one.
    pub fn attach(&self, link: Arc<dyn GameLink>) -> Option<Arc<dyn GameLink>> {
        self.link.write().replace(link)
    }

    /// Remove the link.
    pub fn detach(&self) -> Option<Arc<dyn GameLink>> {
        self.link.write().take()
    }

    /// The live link.
    #[must_use]
    pub fn current(&self) -> Option<Arc<dyn GameLink>> {
        self.link.read().clone()
    }

    /// Whether a link is installed.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.link.read().is_some()
    }

    /// The bot's player name on the live link.
    #[must_use]
    pub fn username(&self) -> Option<String> {
        self.current().map(|link| link.username().to_string())
    }

    /// Say a line in game chat.
    ///
    /// # Errors
    /// Returns `BridgeError::Connection` when no link is installed or the link
    /// refuses the line.
    pub fn send_chat(&self, text: &str) -> Result<()> {
        match self.current() {
            Some(link) => link.send_chat(text),
            None => Err(BridgeError::Connection("not connected to the game server".into())),
        }
    }

    /// Close the live link, if any.
    pub fn quit(&self, reason: &str) {
        if let Some(link) = self.current() {
            link.quit(reason);
        }
    }
}
