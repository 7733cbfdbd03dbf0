// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat service's HTTP surface, as a capability the engine depends on.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::RelayError;
use crate::types::{HistoryPage, HistoryQuery, Notification, RoomId, Session};

/// Remote chat service consumed by the relay engine.
///
/// Implementations must be safe for concurrent use by every room task.
/// Non-success statuses are reported as [`RelayError::Status`] and failed calls
/// without a response as [`RelayError::Transport`]; the engine's retry policy
/// depends on that distinction.
#[async_trait]
pub trait ChatApi: Send + Sync + 'static {
    /// Reads a slice of a room's history, oldest item first.
    async fn history(&self, room: &RoomId, query: &HistoryQuery)
    -> Result<HistoryPage, RelayError>;

    /// Posts a plain message to a room.
    async fn post_message(&self, room: &RoomId, message: &str) -> Result<(), RelayError>;

    /// Posts a notification to a room, authenticated with `token`.
    async fn notify(
        &self,
        room: &RoomId,
        notification: &Notification,
        token: &SecretString,
    ) -> Result<(), RelayError>;

    /// Resolves the configured credential to its owning session.
    async fn session(&self) -> Result<Session, RelayError>;
}
