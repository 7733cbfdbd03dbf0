// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted chat service for deterministic engine tests.
//!
//! `MockChatApi` implements `ChatApi` with per-room queues of history
//! responses and one queue of outcomes shared by message and notification
//! posts. Every call is recorded for assertion. An exhausted history queue
//! answers with an empty page; an exhausted send queue answers `Ok(())`.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{Mutex, Notify};

use hubrelay_core::RelayError;
use hubrelay_core::traits::ChatApi;
use hubrelay_core::types::{
    Author, HistoryPage, HistoryQuery, Message, MessageId, MessageKind, Notification,
    RateTelemetry, RoomId, Session, SessionOwner,
};

/// One outbound call seen by the mock, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostAttempt {
    Message {
        room: RoomId,
        text: String,
    },
    Notification {
        room: RoomId,
        notification: Notification,
        token: String,
    },
}

impl PostAttempt {
    /// Text of a message post, `None` for notifications.
    pub fn text(&self) -> Option<&str> {
        match self {
            PostAttempt::Message { text, .. } => Some(text),
            PostAttempt::Notification { .. } => None,
        }
    }
}

/// A chat service double with scripted responses.
pub struct MockChatApi {
    owner: SessionOwner,
    access_token: String,
    session_error: Mutex<Option<RelayError>>,
    history: Mutex<HashMap<RoomId, VecDeque<Result<HistoryPage, RelayError>>>>,
    history_calls: Mutex<Vec<(RoomId, HistoryQuery)>>,
    send_results: Mutex<VecDeque<Result<(), RelayError>>>,
    attempts: Mutex<Vec<PostAttempt>>,
    activity: Notify,
}

impl MockChatApi {
    /// Create a mock whose session belongs to owner `42` ("Relay Bot").
    pub fn new() -> Self {
        Self::with_owner("42", "Relay Bot")
    }

    /// Create a mock whose session belongs to the given owner.
    pub fn with_owner(id: &str, name: &str) -> Self {
        Self {
            owner: SessionOwner {
                id: id.to_string(),
                name: name.to_string(),
            },
            access_token: "session-token".to_string(),
            session_error: Mutex::new(None),
            history: Mutex::new(HashMap::new()),
            history_calls: Mutex::new(Vec::new()),
            send_results: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(Vec::new()),
            activity: Notify::new(),
        }
    }

    /// Queue a successful history page for `room`, without telemetry.
    pub async fn push_history(&self, room: &str, items: Vec<Message>) {
        self.push_history_result(
            room,
            Ok(HistoryPage {
                items,
                telemetry: None,
            }),
        )
        .await;
    }

    /// Queue a successful history page for `room` carrying rate telemetry.
    pub async fn push_history_with_telemetry(
        &self,
        room: &str,
        items: Vec<Message>,
        telemetry: RateTelemetry,
    ) {
        self.push_history_result(
            room,
            Ok(HistoryPage {
                items,
                telemetry: Some(telemetry),
            }),
        )
        .await;
    }

    /// Queue an arbitrary history outcome for `room`.
    pub async fn push_history_result(&self, room: &str, result: Result<HistoryPage, RelayError>) {
        self.history
            .lock()
            .await
            .entry(RoomId::from(room))
            .or_default()
            .push_back(result);
    }

    /// Queue the outcome of the next message or notification post.
    pub async fn push_send_result(&self, result: Result<(), RelayError>) {
        self.send_results.lock().await.push_back(result);
    }

    /// Make the next `session()` call fail.
    pub async fn fail_session(&self, error: RelayError) {
        *self.session_error.lock().await = Some(error);
    }

    /// Every history request made so far, in order.
    pub async fn history_calls(&self) -> Vec<(RoomId, HistoryQuery)> {
        self.history_calls.lock().await.clone()
    }

    /// History requests made for one room.
    pub async fn history_calls_for(&self, room: &str) -> Vec<HistoryQuery> {
        self.history_calls
            .lock()
            .await
            .iter()
            .filter(|(r, _)| r.as_str() == room)
            .map(|(_, q)| q.clone())
            .collect()
    }

    /// Every outbound attempt made so far, including failed ones.
    pub async fn attempts(&self) -> Vec<PostAttempt> {
        self.attempts.lock().await.clone()
    }

    /// Texts of every message post attempt, in order.
    pub async fn posted_texts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .await
            .iter()
            .filter_map(|a| a.text().map(str::to_string))
            .collect()
    }

    /// Wait until at least `n` history requests were made for `room`.
    pub async fn wait_for_history_calls(&self, room: &str, n: usize) {
        loop {
            let notified = self.activity.notified();
            if self.history_calls_for(room).await.len() >= n {
                return;
            }
            notified.await;
        }
    }

    /// Wait until at least `n` outbound attempts were made.
    pub async fn wait_for_attempts(&self, n: usize) {
        loop {
            let notified = self.activity.notified();
            if self.attempts.lock().await.len() >= n {
                return;
            }
            notified.await;
        }
    }

    async fn next_send_result(&self) -> Result<(), RelayError> {
        self.send_results.lock().await.pop_front().unwrap_or(Ok(()))
    }
}

impl Default for MockChatApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatApi for MockChatApi {
    async fn history(
        &self,
        room: &RoomId,
        query: &HistoryQuery,
    ) -> Result<HistoryPage, RelayError> {
        self.history_calls
            .lock()
            .await
            .push((room.clone(), query.clone()));
        let scripted = self
            .history
            .lock()
            .await
            .get_mut(room)
            .and_then(VecDeque::pop_front);
        self.activity.notify_waiters();

        let mut page = scripted.unwrap_or_else(|| Ok(HistoryPage::default()))?;
        for item in &mut page.items {
            item.room = room.clone();
        }
        Ok(page)
    }

    async fn post_message(&self, room: &RoomId, message: &str) -> Result<(), RelayError> {
        self.attempts.lock().await.push(PostAttempt::Message {
            room: room.clone(),
            text: message.to_string(),
        });
        self.activity.notify_waiters();
        self.next_send_result().await
    }

    async fn notify(
        &self,
        room: &RoomId,
        notification: &Notification,
        token: &SecretString,
    ) -> Result<(), RelayError> {
        self.attempts.lock().await.push(PostAttempt::Notification {
            room: room.clone(),
            notification: notification.clone(),
            token: token.expose_secret().to_string(),
        });
        self.activity.notify_waiters();
        self.next_send_result().await
    }

    async fn session(&self) -> Result<Session, RelayError> {
        if let Some(err) = self.session_error.lock().await.take() {
            return Err(err);
        }
        Ok(Session {
            owner: self.owner.clone(),
            access_token: SecretString::from(self.access_token.clone()),
        })
    }
}

/// An ordinary chat message from a user with a numeric id.
pub fn message(id: &str, author_id: &str, body: &str) -> Message {
    Message {
        id: MessageId::from(id),
        author: Author {
            id: Some(author_id.to_string()),
            name: format!("User {author_id}"),
            mention_name: Some(format!("user{author_id}")),
        },
        body: body.to_string(),
        kind: MessageKind::Message,
        room: RoomId::from(""),
    }
}

/// A system notification posted under a display name.
pub fn notification(id: &str, from: &str, body: &str) -> Message {
    Message {
        id: MessageId::from(id),
        author: Author {
            id: None,
            name: from.to_string(),
            mention_name: None,
        },
        body: body.to_string(),
        kind: MessageKind::Notification,
        room: RoomId::from(""),
    }
}

/// A server error status, as the HTTP client would report it.
pub fn status_error(status: u16) -> RelayError {
    RelayError::Status {
        status,
        message: format!("scripted status {status}"),
    }
}
