//! SQLite persistence for account state.
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS users (
//!     tag      TEXT PRIMARY KEY,
//!     player   TEXT NOT NULL,
//!     token    TEXT NOT NULL DEFAULT '',
//!     verified INTEGER NOT NULL DEFAULT 0
//! );
//! CREATE TABLE IF NOT EXISTS settings (key TEXT PRIMARY KEY, value TEXT NOT NULL);
//! CREATE TABLE IF NOT EXISTS channels (name TEXT PRIMARY KEY, channel_id TEXT NOT NULL);
//! CREATE TABLE IF NOT EXISTS checks (
//!     kind       TEXT PRIMARY KEY,
//!     checked_by TEXT NOT NULL,
//!     checked_at TEXT NOT NULL
//! );
//! ```
//!
//! The connection sits behind a `parking_lot::Mutex`: rusqlite connections are
//! `Send` but not `Sync`, and every statement here is short.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::config::PersistenceConfig;
use crate::error::{BridgeError, Result};
use crate::store::AccountStore;
use crate::types::{ChannelId, CheckKind, CheckRecord, Identity, Origin};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        tag      TEXT PRIMARY KEY,
        player   TEXT NOT NULL,
        token    TEXT NOT NULL DEFAULT '',
        verified INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS users_player ON users (player COLLATE NOCASE);
    CREATE TABLE IF NOT EXISTS settings (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS channels (
        name       TEXT PRIMARY KEY,
        channel_id TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS checks (
        kind       TEXT PRIMARY KEY,
        checked_by TEXT NOT NULL,
        checked_at TEXT NOT NULL
    );
";

const SHIELD_KEY: &str = "shield";

/// Account store backed by an SQLite database.
pub struct SqliteAccountStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteAccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAccountStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteAccountStore {
    /// Open (or create) the database at `config.path`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Database`] on SQLite failures.
    pub fn open(config: &PersistenceConfig) -> Result<Self> {
        Self::open_path(&config.path, config.wal_mode)
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Database`] on SQLite failures.
    pub fn open_path<P: AsRef<Path>>(path: P, wal_mode: bool) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(path = %db_path.display(), wal = wal_mode, "Account store opened");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.db_path
    }
}

impl AccountStore for SqliteAccountStore {
    fn is_verified(&self, who: &Identity) -> Result<bool> {
        let conn = self.conn.lock();
        let sql = match who.origin {
            Origin::Group => "SELECT EXISTS(SELECT 1 FROM users WHERE tag = ?1 AND verified = 1)",
            Origin::Game => {
                "SELECT EXISTS(SELECT 1 FROM users WHERE player = ?1 COLLATE NOCASE AND verified = 1)"
            }
        };
        let verified: bool = conn.query_row(sql, params![who.name], |row| row.get(0))?;
        Ok(verified)
    }

    fn is_shield_active(&self) -> Result<bool> {
        let conn = self.conn.lock();
        let value: Option<String> = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", params![SHIELD_KEY], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value.as_deref() == Some("on"))
    }

    fn set_shield(&self, active: bool) -> Result<()> {
        let value = if active { "on" } else { "off" };
        self.conn.lock().execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![SHIELD_KEY, value],
        )?;
        info!(shield = value, "Shield updated");
        Ok(())
    }

    fn resolve_destination(&self, name: &str) -> Result<Option<ChannelId>> {
        let conn = self.conn.lock();
        let channel: Option<String> = conn
            .query_row("SELECT channel_id FROM channels WHERE name = ?1", params![name], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(channel.map(ChannelId))
    }

    fn bind_destination(&self, name: &str, channel: &ChannelId) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO channels (name, channel_id) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET channel_id = excluded.channel_id",
            params![name, channel.as_str()],
        )?;
        debug!(destination = name, channel = %channel, "Destination bound");
        Ok(())
    }

    fn begin_verification(&self, tag: &str, player: &str, token: &str) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO users (tag, player, token, verified) VALUES (?1, ?2, ?3, 0)
             ON CONFLICT(tag) DO UPDATE SET
                player = excluded.player,
                token = excluded.token,
                verified = 0",
            params![tag, player, token],
        )?;
        Ok(())
    }

    fn complete_verification(&self, player: &str, token: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let tag: Option<String> = conn
            .query_row(
                "SELECT tag FROM users
                 WHERE player = ?1 COLLATE NOCASE AND token = ?2 AND verified = 0",
                params![player, token],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(ref tag) = tag {
            conn.execute(
                "UPDATE users SET verified = 1, token = '' WHERE tag = ?1",
                params![tag],
            )?;
            info!(tag = %tag, player = player, "User verified");
        }
        Ok(tag)
    }

    fn clear_temporary_state(&self) -> Result<usize> {
        let removed = self.conn.lock().execute("DELETE FROM users WHERE verified = 0", [])?;
        if removed > 0 {
            debug!(removed, "Temporary users cleared");
        }
        Ok(removed)
    }

    fn remove_user(&self, tag: &str) -> Result<bool> {
        let removed = self.conn.lock().execute("DELETE FROM users WHERE tag = ?1", params![tag])?;
        Ok(removed > 0)
    }

    fn record_check(&self, kind: CheckKind, by: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn.lock().execute(
            "INSERT INTO checks (kind, checked_by, checked_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(kind) DO UPDATE SET
                checked_by = excluded.checked_by,
                checked_at = excluded.checked_at",
            params![kind.as_str(), by, at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn last_check(&self, kind: CheckKind) -> Result<Option<CheckRecord>> {
        let conn = self.conn.lock();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT checked_by, checked_at FROM checks WHERE kind = ?1",
                params![kind.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((checked_by, checked_at)) = row else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&checked_at) {
            Ok(at) => Ok(Some(CheckRecord {
                kind,
                checked_by,
                checked_at: at.with_timezone(&Utc),
            })),
            Err(e) => {
                warn!(kind = %kind, raw = %checked_at, "Unreadable check timestamp");
                Err(BridgeError::Store(e.to_string()))
            }
        }
    }
}
