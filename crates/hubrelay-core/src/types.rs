// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the chat API capability, the relay engine, and the host.

use std::fmt;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::EnumString;

/// Opaque identifier of a chat room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RoomId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Server-assigned message identifier. Ordered by the server, opaque to us.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Type tag of a history item.
///
/// Tags this relay does not interpret are kept verbatim in [`MessageKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
    /// An ordinary chat message written by a user.
    Message,
    /// A system or integration notification.
    Notification,
    #[strum(default)]
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Message => "message",
            MessageKind::Notification => "notification",
            MessageKind::Other(tag) => tag,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who wrote a message.
///
/// Notifications carry only a display name, so `id` is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<String>,
    pub name: String,
    pub mention_name: Option<String>,
}

/// A message read from a room's history. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub author: Author,
    pub body: String,
    pub kind: MessageKind,
    pub room: RoomId,
}

/// Rate-limit telemetry reported by the server alongside a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateTelemetry {
    /// Calls left in the current window.
    pub remaining: u64,
    /// Call ceiling for a full window.
    pub limit: u64,
    /// Unix timestamp (seconds) at which the window resets.
    pub reset_at: i64,
}

impl RateTelemetry {
    /// Seconds until the window resets, relative to `now` (unix seconds).
    pub fn window_secs(&self, now: i64) -> i64 {
        self.reset_at - now
    }
}

/// Which slice of a room's history to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryQuery {
    /// The newest `max_results` messages.
    Latest { max_results: u32 },
    /// Every message at or after the given id, oldest first.
    NotBefore(MessageId),
}

/// One page of room history, oldest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub items: Vec<Message>,
    pub telemetry: Option<RateTelemetry>,
}

/// A rich notification posted to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub color: String,
    pub message_format: String,
    pub notify: bool,
}

/// The account that owns the relay's credential.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionOwner {
    pub id: String,
    pub name: String,
}

/// Session resolved from the configured credential at startup.
#[derive(Debug)]
pub struct Session {
    pub owner: SessionOwner,
    /// Token used for notification calls. Never logged.
    pub access_token: SecretString,
}

/// Addressing information for an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub room: RoomId,
    /// Author of the message being answered, if any.
    pub user: Option<Author>,
}

impl Envelope {
    pub fn room(room: impl Into<RoomId>) -> Self {
        Self {
            room: room.into(),
            user: None,
        }
    }
}

/// A message handed to the host pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRecord {
    pub id: MessageId,
    pub author: Author,
    pub body: String,
    pub room: RoomId,
}

impl InboundRecord {
    /// Envelope addressing a reply to this record's room and author.
    pub fn envelope(&self) -> Envelope {
        Envelope {
            room: self.room.clone(),
            user: Some(self.author.clone()),
        }
    }
}

impl From<Message> for InboundRecord {
    fn from(msg: Message) -> Self {
        Self {
            id: msg.id,
            author: msg.author,
            body: msg.body,
            room: msg.room,
        }
    }
}

/// Outcome of an outbound delivery job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Every chunk was acknowledged.
    Delivered { chunks: usize },
    /// A transport failure aborted the job; `chunks` were acknowledged before it.
    Dropped { chunks: usize },
}

impl Delivery {
    pub fn chunks(&self) -> usize {
        match self {
            Delivery::Delivered { chunks } | Delivery::Dropped { chunks } => *chunks,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered { .. })
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCapabilities {
    pub supports_images: bool,
    pub supports_emote: bool,
    pub max_message_length: Option<usize>,
}
