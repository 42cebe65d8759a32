//! Wire payloads for the group network's create-message endpoint.

use chatbridge_core::types::{GroupMessage, Reply};
use serde::Serialize;

/// Maximum message content length the API accepts, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Maximum embed description length the API accepts, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

/// Body of `POST /channels/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<EmbedPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<FooterPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<ThumbnailPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldPayload {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FooterPayload {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThumbnailPayload {
    pub url: String,
}

/// Cut `s` to at most `max` characters, on a char boundary.
#[must_use]
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}

impl From<&Reply> for EmbedPayload {
    fn from(reply: &Reply) -> Self {
        Self {
            title: reply.title.clone(),
            description: reply
                .description
                .as_deref()
                .map(|d| truncate_chars(d, MAX_DESCRIPTION_CHARS)),
            color: reply.color,
            fields: reply
                .fields
                .iter()
                .map(|f| FieldPayload {
                    name: f.name.clone(),
                    value: f.value.clone(),
                    inline: f.inline,
                })
                .collect(),
            footer: reply.footer.clone().map(|text| FooterPayload { text }),
            thumbnail: reply.thumbnail.clone().map(|url| ThumbnailPayload { url }),
            timestamp: reply.timestamp.map(|t| t.to_rfc3339()),
        }
    }
}

impl From<&GroupMessage> for MessagePayload {
    fn from(message: &GroupMessage) -> Self {
        match message {
            GroupMessage::Text { content } => Self {
                content: Some(truncate_chars(content, MAX_CONTENT_CHARS)),
                embeds: Vec::new(),
            },
            GroupMessage::Rich { reply } => Self {
                content: None,
                embeds: vec![EmbedPayload::from(reply)],
            },
        }
    }
}
