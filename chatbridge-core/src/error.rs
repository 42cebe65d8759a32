//! Error types for the chatbridge core library.

use thiserror::Error;

use crate::types::Origin;

/// Top-level error type for all core operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Two commands were registered under the same keyword for one origin.
    #[error("Duplicate command keyword '{keyword}' for {origin} origin")]
    DuplicateCommand {
        /// The conflicting keyword.
        keyword: String,
        /// Origin the keyword was registered for.
        origin: Origin,
    },

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Account store failure not covered by a more specific variant.
    #[error("Account store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The game connection is not available (never connected, or reconnecting).
    #[error("Game connection unavailable: {0}")]
    Connection(String),

    /// Publishing to the group network failed.
    #[error("Publish to {destination} failed: {reason}")]
    Publish {
        /// Destination channel.
        destination: String,
        /// Why the publish failed.
        reason: String,
    },

    /// A command body failed.
    #[error("Command '{keyword}' failed: {reason}")]
    Execution {
        /// Keyword of the failing command.
        keyword: String,
        /// Failure description.
        reason: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for BridgeError {
    fn from(err: config::ConfigError) -> Self {
        BridgeError::Config(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, BridgeError>;
