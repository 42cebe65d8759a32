//! Line-based TCP adapters.
//!
//! Game side: the bot connects to a chat gateway, announces its username on the
//! first line, then exchanges one chat line per text line. Lines starting with
//! `#` are control lines:
//!
//! | line              | event                   |
//! |-------------------|-------------------------|
//! | `#login`          | [`GameEvent::Login`]    |
//! | `#death`          | [`GameEvent::Death`]    |
//! | `#kicked <why>`   | [`GameEvent::Kicked`]   |
//! | `#error <what>`   | [`GameEvent::Error`]    |
//!
//! Any other line is a [`GameEvent::ChatLine`], followed by a
//! [`GameEvent::PlayerChat`] when it has the `<name> message` shape. A line
//! that is not valid UTF-8 is relayed lossily as chat and never treated as a
//! player command.
//!
//! Group side: a relay accepts connections from a group gateway and reads one
//! JSON [`GroupEvent`] per line.

use std::sync::Arc;

use async_trait::async_trait;
use chatbridge_core::connection::GameLink;
use chatbridge_core::error::{BridgeError, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::context::BridgeContext;
use crate::events::{GameEvent, GroupEvent};
use crate::game::{GameConnector, GameSession};
use crate::hooks;

const EVENT_QUEUE: usize = 256;

/// Parse one inbound game line into the events it produces.
#[must_use]
pub fn parse_game_line(line: &str) -> Vec<GameEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Vec::new();
    }
    if let Some(control) = line.strip_prefix('#') {
        let (word, rest) = control.split_once(' ').unwrap_or((control, ""));
        let event = match word {
            "login" => Some(GameEvent::Login),
            "death" => Some(GameEvent::Death),
            "kicked" => Some(GameEvent::Kicked { reason: rest.to_string() }),
            "error" => Some(GameEvent::Error(rest.to_string())),
            _ => None,
        };
        if let Some(event) = event {
            return vec![event];
        }
    }

    let mut events = vec![GameEvent::ChatLine(line.to_string())];
    if let Some((username, message)) = split_player_chat(line) {
        events.push(GameEvent::PlayerChat {
            username: username.to_string(),
            message: message.to_string(),
        });
    }
    events
}

/// Parse one raw inbound line, tolerating invalid UTF-8.
#[must_use]
pub fn parse_game_bytes(raw: &[u8]) -> Vec<GameEvent> {
    match std::str::from_utf8(raw) {
        Ok(line) => parse_game_line(line),
        Err(_) => {
            let lossy = String::from_utf8_lossy(raw);
            let line = lossy.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                return Vec::new();
            }
            debug!(bytes = raw.len(), "Undecodable game line relayed as chat");
            vec![GameEvent::ChatLine(line.to_string())]
        }
    }
}

fn split_player_chat(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('<')?;
    let (username, message) = rest.split_once("> ")?;
    let valid = !username.is_empty()
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some((username, message))
}

enum Outbound {
    Line(String),
    Quit(String),
}

/// Outbound half of a TCP game connection.
pub struct TcpGameLink {
    username: String,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl GameLink for TcpGameLink {
    fn send_chat(&self, text: &str) -> Result<()> {
        self.tx
            .send(Outbound::Line(text.to_string()))
            .map_err(|_| BridgeError::Connection("game connection closed".into()))
    }

    fn quit(&self, reason: &str) {
        let _ = self.tx.send(Outbound::Quit(reason.to_string()));
    }

    fn username(&self) -> &str {
        &self.username
    }
}

/// Connects to the game chat gateway at `game.host:game.port`.
#[derive(Debug, Clone)]
pub struct TcpGameConnector {
    addr: String,
    username: String,
}

impl TcpGameConnector {
    /// Connector for `addr`, logging in as `username`.
    #[must_use]
    pub fn new(addr: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            username: username.into(),
        }
    }
}

#[async_trait]
impl GameConnector for TcpGameConnector {
    async fn connect(&self) -> Result<GameSession> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| BridgeError::Connection(format!("connect {}: {e}", self.addr)))?;
        let (rd, mut wr) = stream.into_split();
        wr.write_all(format!("{}\n", self.username).as_bytes()).await?;
        info!(addr = %self.addr, username = %self.username, "Game socket open");

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let (line, last) = match msg {
                    Outbound::Line(text) => (text, false),
                    Outbound::Quit(reason) => (format!("#quit {reason}"), true),
                };
                if let Err(e) = wr.write_all(format!("{line}\n").as_bytes()).await {
                    warn!(error = %e, "Game socket write failed");
                    break;
                }
                if last {
                    let _ = wr.shutdown().await;
                    break;
                }
            }
        });

        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
        tokio::spawn(async move {
            let mut rd = BufReader::new(rd);
            let mut line = Vec::new();
            loop {
                line.clear();
                match rd.read_until(b'\n', &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        let _ = event_tx.send(GameEvent::Error(e.to_string())).await;
                        break;
                    }
                }
                for event in parse_game_bytes(&line) {
                    if event_tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            let _ = event_tx.send(GameEvent::End).await;
        });

        Ok(GameSession {
            link: Arc::new(TcpGameLink {
                username: self.username.clone(),
                tx: out_tx,
            }),
            events: event_rx,
        })
    }
}

/// Accept group gateway connections on `bind` and feed their events to the bridge.
///
/// # Errors
/// Returns an error if the listener cannot be bound.
pub async fn bind_group_relay(bind: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(bind).await?;
    info!(bind = %bind, "Group relay listening");
    Ok(listener)
}

/// Serve the group relay. Each gateway connection is read serially by a
/// scheduler service, so no connection outlives shutdown.
pub async fn serve_group_relay(ctx: Arc<BridgeContext>, listener: TcpListener) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Group relay accept failed");
                continue;
            }
        };
        info!(peer = %peer, "Group gateway connected");
        let conn_ctx = Arc::clone(&ctx);
        ctx.scheduler.spawn_service("group-relay-connection", async move {
            let ctx = conn_ctx;
            let mut rd = BufReader::new(stream);
            let mut line = Vec::new();
            loop {
                line.clear();
                match rd.read_until(b'\n', &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(peer = %peer, error = %e, "Group relay read failed");
                        break;
                    }
                }
                let raw = line.trim_ascii();
                if raw.is_empty() {
                    continue;
                }
                match serde_json::from_slice::<GroupEvent>(raw) {
                    Ok(event) => hooks::handle_group_event(&ctx, event).await,
                    Err(e) => warn!(peer = %peer, error = %e, "Bad group event"),
                }
            }
            debug!(peer = %peer, "Group gateway disconnected");
        });
    }
}
