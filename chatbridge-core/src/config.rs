//! Configuration for the bridge.
//!
//! Maps directly to `chatbridge.toml`. Every section has defaults, so an empty
//! file is a valid (if not very useful) configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Environment variable prefix for layered overrides, e.g.
/// `CHATBRIDGE__GAME__HOST=play.example.net`.
pub const ENV_PREFIX: &str = "CHATBRIDGE";

/// Top-level bridge configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Game connection settings.
    #[serde(default)]
    pub game: GameConfig,
    /// Group network settings.
    #[serde(default)]
    pub group: GroupConfig,
    /// Fixed delays and periods.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Account store settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl BridgeConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `BridgeError::Config` if the TOML is invalid or fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an optional file layered under
    /// `CHATBRIDGE__SECTION__KEY` environment overrides.
    ///
    /// # Errors
    /// Returns `BridgeError::Config` if a source is malformed or validation fails.
    pub fn load_layered(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the bridge cannot run with.
    ///
    /// # Errors
    /// Returns `BridgeError::Config` naming the offending key.
    pub fn validate(&self) -> Result<()> {
        if self.general.prefix.trim().is_empty() {
            return Err(BridgeError::Config("general.prefix must not be empty".into()));
        }
        if self.general.prefix.chars().any(char::is_whitespace) {
            return Err(BridgeError::Config("general.prefix must not contain whitespace".into()));
        }
        let t = &self.timing;
        let periods = [
            ("timing.cooldown_secs", t.cooldown_secs),
            ("timing.capture_flush_ms", t.capture_flush_ms),
            ("timing.ambient_flush_secs", t.ambient_flush_secs),
            ("timing.reconnect_backoff_secs", t.reconnect_backoff_secs),
            ("timing.wallcheck_secs", t.wallcheck_secs),
            ("timing.buffercheck_secs", t.buffercheck_secs),
            ("timing.ftop_minutes", t.ftop_minutes),
            ("timing.flist_minutes", t.flist_minutes),
            ("timing.join_command_minutes", t.join_command_minutes),
        ];
        if let Some((key, _)) = periods.iter().find(|(_, v)| *v == 0) {
            return Err(BridgeError::Config(format!("{key} must be greater than zero")));
        }
        Ok(())
    }

    /// Freeze the timing section into durations.
    #[must_use]
    pub fn timings(&self) -> Timings {
        Timings::from(&self.timing)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Command prefix shared by both networks.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Game-side connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Host of the game chat endpoint.
    #[serde(default = "default_game_host")]
    pub host: String,
    /// Port of the game chat endpoint.
    #[serde(default = "default_game_port")]
    pub port: u16,
    /// The bot's own player name; lines it authored are never commands.
    #[serde(default = "default_username")]
    pub username: String,
    /// Command sent on login and periodically afterwards.
    #[serde(default = "default_join_command")]
    pub join_command: String,
    /// Avatar URL prefix; the player name is appended to form the thumbnail.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            host: default_game_host(),
            port: default_game_port(),
            username: default_username(),
            join_command: default_join_command(),
            avatar_url: None,
        }
    }
}

/// Group network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// REST API base URL of the group network.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bot credential. Empty disables publishing.
    #[serde(default)]
    pub bot_token: String,
    /// Address the inbound relay listens on.
    #[serde(default = "default_relay_bind")]
    pub relay_bind: String,
    /// Per-request timeout for publishes.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            bot_token: String::new(),
            relay_bind: default_relay_bind(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Fixed delays and periods. Read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// How long a group caller stays throttled after a command.
    #[serde(default = "default_10")]
    pub cooldown_secs: u64,
    /// Delay between command start and the capture flush.
    #[serde(default = "default_300")]
    pub capture_flush_ms: u64,
    /// Period of the ambient chat flush.
    #[serde(default = "default_3")]
    pub ambient_flush_secs: u64,
    /// Backoff before re-establishing a lost game connection.
    #[serde(default = "default_6")]
    pub reconnect_backoff_secs: u64,
    /// Period of the wall check report.
    #[serde(default = "default_60")]
    pub wallcheck_secs: u64,
    /// Period of the buffer check report.
    #[serde(default = "default_65")]
    pub buffercheck_secs: u64,
    /// Period of the ftop trigger, in minutes.
    #[serde(default = "default_30")]
    pub ftop_minutes: u64,
    /// Period of the flist trigger, in minutes (plus a 5 s offset).
    #[serde(default = "default_30")]
    pub flist_minutes: u64,
    /// Period of the join command keepalive, in minutes.
    #[serde(default = "default_10")]
    pub join_command_minutes: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 10,
            capture_flush_ms: 300,
            ambient_flush_secs: 3,
            reconnect_backoff_secs: 6,
            wallcheck_secs: 60,
            buffercheck_secs: 65,
            ftop_minutes: 30,
            flist_minutes: 30,
            join_command_minutes: 10,
        }
    }
}

/// Immutable durations derived from [`TimingConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Cooldown time-to-live.
    pub cooldown: Duration,
    /// Capture flush delay.
    pub capture_flush: Duration,
    /// Ambient flush period.
    pub ambient_flush: Duration,
    /// Reconnect backoff.
    pub reconnect_backoff: Duration,
    /// Wall check period.
    pub wallcheck: Duration,
    /// Buffer check period.
    pub buffercheck: Duration,
    /// Ftop trigger period.
    pub ftop: Duration,
    /// Flist trigger period.
    pub flist: Duration,
    /// Join command period.
    pub join_command: Duration,
}

impl From<&TimingConfig> for Timings {
    fn from(t: &TimingConfig) -> Self {
        const MINUTE: u64 = 60;
        Self {
            cooldown: Duration::from_secs(t.cooldown_secs),
            capture_flush: Duration::from_millis(t.capture_flush_ms),
            ambient_flush: Duration::from_secs(t.ambient_flush_secs),
            reconnect_backoff: Duration::from_secs(t.reconnect_backoff_secs),
            wallcheck: Duration::from_secs(t.wallcheck_secs),
            buffercheck: Duration::from_secs(t.buffercheck_secs),
            ftop: Duration::from_secs(t.ftop_minutes * MINUTE),
            flist: Duration::from_secs(t.flist_minutes * MINUTE + 5),
            join_command: Duration::from_secs(t.join_command_minutes * MINUTE),
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self::from(&TimingConfig::default())
    }
}

/// Account store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            wal_mode: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_prefix() -> String { "!".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_game_host() -> String { "127.0.0.1".to_string() }
fn default_game_port() -> u16 { 25_575 }
fn default_username() -> String { "BridgeBot".to_string() }
fn default_join_command() -> String { "/server factions".to_string() }
fn default_api_base() -> String { "https://discord.com/api/v10".to_string() }
fn default_relay_bind() -> String { "127.0.0.1:7878".to_string() }
fn default_request_timeout_ms() -> u64 { 5000 }
fn default_db_path() -> String { "chatbridge.db".to_string() }
fn default_3() -> u64 { 3 }
fn default_6() -> u64 { 6 }
fn default_10() -> u64 { 10 }
fn default_30() -> u64 { 30 }
fn default_60() -> u64 { 60 }
fn default_65() -> u64 { 65 }
fn default_300() -> u64 { 300 }
