//! Shared fakes for the runtime integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chatbridge_core::config::BridgeConfig;
use chatbridge_core::connection::{GameLink, GroupSink};
use chatbridge_core::error::{BridgeError, Result};
use chatbridge_core::store::MemoryAccountStore;
use chatbridge_core::types::{ChannelId, GroupMessage};
use chatbridge_runtime::events::{GameEvent, GroupMessageEvent};
use chatbridge_runtime::game::{GameConnector, GameSession};
use chatbridge_runtime::{BridgeContext, LinkState};
use parking_lot::Mutex;
use tokio::sync::mpsc;

pub const BOT_NAME: &str = "BridgeBot";

/// Records every publish; optionally fails them all.
#[derive(Default)]
pub struct RecordingSink {
    pub published: Mutex<Vec<(ChannelId, GroupMessage)>>,
    pub failing: Mutex<bool>,
}

impl RecordingSink {
    pub fn len(&self) -> usize {
        self.published.lock().len()
    }

    pub fn take(&self) -> Vec<(ChannelId, GroupMessage)> {
        std::mem::take(&mut *self.published.lock())
    }

    pub fn texts(&self) -> Vec<String> {
        self.published
            .lock()
            .iter()
            .filter_map(|(_, m)| match m {
                GroupMessage::Text { content } => Some(content.clone()),
                GroupMessage::Rich { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl GroupSink for RecordingSink {
    async fn publish(&self, channel: &ChannelId, message: &GroupMessage) -> Result<()> {
        if *self.failing.lock() {
            return Err(BridgeError::Publish {
                destination: channel.to_string(),
                reason: "unreachable".into(),
            });
        }
        self.published.lock().push((channel.clone(), message.clone()));
        Ok(())
    }
}

/// Game link that remembers what it was asked to say.
pub struct FakeGameLink {
    pub name: String,
    pub sent: Mutex<Vec<String>>,
    pub quit_reason: Mutex<Option<String>>,
}

impl FakeGameLink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            name: BOT_NAME.to_string(),
            sent: Mutex::new(Vec::new()),
            quit_reason: Mutex::new(None),
        })
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

impl GameLink for FakeGameLink {
    fn send_chat(&self, text: &str) -> Result<()> {
        self.sent.lock().push(text.to_string());
        Ok(())
    }

    fn quit(&self, reason: &str) {
        *self.quit_reason.lock() = Some(reason.to_string());
    }

    fn username(&self) -> &str {
        &self.name
    }
}

/// The test's end of a scripted connection.
pub struct ServerSide {
    pub events: mpsc::Sender<GameEvent>,
    pub link: Arc<FakeGameLink>,
}

/// Connector whose connections are driven by the test.
pub struct ScriptedConnector {
    accepted: mpsc::UnboundedSender<ServerSide>,
}

impl ScriptedConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerSide>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { accepted }), rx)
    }
}

#[async_trait]
impl GameConnector for ScriptedConnector {
    async fn connect(&self) -> Result<GameSession> {
        let (tx, rx) = mpsc::channel(64);
        let link = FakeGameLink::new();
        self.accepted
            .send(ServerSide {
                events: tx,
                link: Arc::clone(&link),
            })
            .map_err(|_| BridgeError::Connection("test finished".into()))?;
        Ok(GameSession { link, events: rx })
    }
}

pub struct Harness {
    pub ctx: Arc<BridgeContext>,
    pub store: Arc<MemoryAccountStore>,
    pub sink: Arc<RecordingSink>,
}

/// Bridge over in-memory collaborators, not yet connected.
pub fn harness() -> Harness {
    harness_with(|_| {})
}

/// Like [`harness`], with the default configuration adjusted first.
pub fn harness_with(configure: impl FnOnce(&mut BridgeConfig)) -> Harness {
    let store = Arc::new(MemoryAccountStore::new());
    let sink = Arc::new(RecordingSink::default());
    let mut config = BridgeConfig::default();
    config.game.username = BOT_NAME.to_string();
    configure(&mut config);
    let ctx = BridgeContext::new(config, store.clone(), sink.clone()).expect("context");
    Harness { ctx, store, sink }
}

/// Bridge with a live fake link.
pub fn connected() -> (Harness, Arc<FakeGameLink>) {
    connect(harness())
}

/// Attach a fake link to `h` and mark it connected.
pub fn connect(h: Harness) -> (Harness, Arc<FakeGameLink>) {
    let link = FakeGameLink::new();
    h.ctx.game.attach(link.clone());
    h.ctx.link.set(LinkState::Connected);
    (h, link)
}

/// Let every ready task run before the test continues.
pub async fn run_pending() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub fn group_msg(tag: &str, author_id: &str, content: &str) -> GroupMessageEvent {
    GroupMessageEvent {
        author_id: author_id.to_string(),
        tag: tag.to_string(),
        is_bot: false,
        elevated: false,
        direct: false,
        channel: ChannelId::new("general"),
        content: content.to_string(),
    }
}

pub fn admin_msg(content: &str) -> GroupMessageEvent {
    GroupMessageEvent {
        elevated: true,
        ..group_msg("admin#0000", "1", content)
    }
}
