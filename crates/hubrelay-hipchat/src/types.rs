// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the HipChat v2 REST API.

use std::str::FromStr;

use hubrelay_core::types::{Author, Message, MessageId, MessageKind, RoomId, SessionOwner};
use serde::{Deserialize, Serialize};

/// Response of `GET room/{room}/history/latest`.
#[derive(Debug, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub items: Vec<HistoryItem>,
}

/// One history entry.
#[derive(Debug, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    #[serde(default)]
    pub from: Sender,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default = "default_item_type")]
    pub kind: String,
}

fn default_item_type() -> String {
    "message".to_string()
}

/// `from` is an object for users and a bare display name for notifications.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Sender {
    User {
        id: NumericOrText,
        name: String,
        #[serde(default)]
        mention_name: Option<String>,
    },
    Name(String),
}

impl Default for Sender {
    fn default() -> Self {
        Sender::Name(String::new())
    }
}

/// HipChat ids are integers, but be lenient about strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumericOrText {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for NumericOrText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NumericOrText::Number(n) => write!(f, "{n}"),
            NumericOrText::Text(s) => f.write_str(s),
        }
    }
}

impl HistoryItem {
    /// Convert into the relay's message model for `room`.
    pub fn into_message(self, room: &RoomId) -> Message {
        let author = match self.from {
            Sender::User {
                id,
                name,
                mention_name,
            } => Author {
                id: Some(id.to_string()),
                name,
                mention_name,
            },
            Sender::Name(name) => Author {
                id: None,
                name,
                mention_name: None,
            },
        };
        let kind = MessageKind::from_str(&self.kind).unwrap_or(MessageKind::Other(self.kind));

        Message {
            id: MessageId(self.id),
            author,
            body: self.message,
            kind,
            room: room.clone(),
        }
    }
}

/// Body of `POST room/{room}/message`.
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub message: &'a str,
}

/// Response of `GET oauth/token/{token}`.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub owner: TokenOwner,
}

#[derive(Debug, Deserialize)]
pub struct TokenOwner {
    pub id: NumericOrText,
    pub name: String,
}

impl From<TokenOwner> for SessionOwner {
    fn from(owner: TokenOwner) -> Self {
        SessionOwner {
            id: owner.id.to_string(),
            name: owner.name,
        }
    }
}

/// Error envelope returned with 4xx/5xx statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<u16>,
    pub message: String,
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
}
