//! Group client: publishes messages through the group network's REST API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chatbridge_core::config::GroupConfig;
use chatbridge_core::connection::GroupSink;
use chatbridge_core::error::BridgeError;
use chatbridge_core::types::{ChannelId, GroupMessage};
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::NetError;
use crate::types::MessagePayload;

/// Backend the client publishes to.
#[derive(Debug, Clone)]
pub enum GroupProvider {
    /// Bot-authenticated REST API (`{api_base}/channels/{id}/messages`).
    Rest { api_base: String, bot_token: String },
    /// Nothing configured; every publish fails with `Unavailable`.
    None,
}

/// Client for the group network.
pub struct GroupClient {
    provider: GroupProvider,
    http: Client,
    timeout: Duration,
}

impl GroupClient {
    /// Create a new client.
    #[must_use]
    pub fn new(provider: GroupProvider, timeout: Duration) -> Self {
        Self {
            provider,
            http: Client::new(),
            timeout,
        }
    }

    /// Build a client from the `[group]` section. An empty token yields a
    /// client that refuses every publish.
    #[must_use]
    pub fn from_config(config: &GroupConfig) -> Self {
        let provider = if config.bot_token.is_empty() {
            GroupProvider::None
        } else {
            GroupProvider::Rest {
                api_base: config.api_base.trim_end_matches('/').to_string(),
                bot_token: config.bot_token.clone(),
            }
        };
        Self::new(provider, Duration::from_millis(config.request_timeout_ms))
    }

    /// Create a client with no backend.
    #[must_use]
    pub fn none() -> Self {
        Self::new(GroupProvider::None, Duration::from_secs(5))
    }

    /// Check if the client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, GroupProvider::None)
    }

    /// Send one message. No retries: the caller decides what a failure means.
    ///
    /// # Errors
    /// Returns `NetError` if the request fails or the API rejects it.
    pub async fn send(&self, channel: &ChannelId, message: &GroupMessage) -> Result<(), NetError> {
        let (api_base, bot_token) = match &self.provider {
            GroupProvider::None => {
                return Err(NetError::Unavailable("No group provider configured".into()));
            }
            GroupProvider::Rest { api_base, bot_token } => (api_base, bot_token),
        };

        let url = format!("{api_base}/channels/{channel}/messages");
        let payload = MessagePayload::from(message);

        let start = Instant::now();
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bot {bot_token}"))
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;
        let latency_ms = start.elapsed().as_millis();

        let status = resp.status();
        if status.is_success() {
            debug!(channel = %channel, latency_ms, "Group message published");
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            warn!(channel = %channel, status = status.as_u16(), "Group API returned error");
            Err(NetError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl GroupSink for GroupClient {
    async fn publish(&self, channel: &ChannelId, message: &GroupMessage) -> chatbridge_core::error::Result<()> {
        self.send(channel, message)
            .await
            .map_err(|e| BridgeError::Publish {
                destination: channel.to_string(),
                reason: e.to_string(),
            })
    }
}
