// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental history reads anchored on a room's cursor.

use std::sync::Arc;
use std::time::Duration;

use hubrelay_core::error::RelayError;
use hubrelay_core::traits::ChatApi;
use hubrelay_core::types::{HistoryPage, HistoryQuery, Message, MessageId, RateTelemetry, RoomId};
use tracing::{debug, warn};

use crate::cursor::{RoomCursor, advance};

/// Messages newer than the cursor, with the telemetry of the request that
/// returned them.
#[derive(Debug, Clone, Default)]
pub struct Fetched {
    pub messages: Vec<Message>,
    pub telemetry: Option<RateTelemetry>,
}

/// Reads room history and keeps each room's cursor current.
///
/// Error statuses are retried after `retry_delay` without limit. Any other
/// failure is returned to the caller.
#[derive(Clone)]
pub struct HistoryFetcher {
    api: Arc<dyn ChatApi>,
    retry_delay: Duration,
}

impl HistoryFetcher {
    pub fn new(api: Arc<dyn ChatApi>, retry_delay: Duration) -> Self {
        Self { api, retry_delay }
    }

    /// Anchors the cursor on the newest message without delivering anything.
    ///
    /// An empty room leaves the cursor as it was.
    pub async fn initialize(&self, cursor: &RoomCursor) -> Result<Option<MessageId>, RelayError> {
        let mut slot = cursor.lock().await;
        self.anchor(cursor.room(), &mut slot).await?;
        Ok(slot.clone())
    }

    /// Messages strictly after the cursor, oldest first.
    ///
    /// An unset cursor is anchored instead, returning nothing: the first
    /// poll of a room never replays history.
    pub async fn fetch_since(&self, cursor: &RoomCursor) -> Result<Fetched, RelayError> {
        let room = cursor.room();
        let mut slot = cursor.lock().await;

        let Some(anchor) = slot.clone() else {
            let telemetry = self.anchor(room, &mut slot).await?;
            return Ok(Fetched {
                messages: Vec::new(),
                telemetry,
            });
        };

        let page = self
            .history_with_retry(room, &HistoryQuery::NotBefore(anchor.clone()))
            .await?;
        let mut items = page.items;

        // The server includes the anchor itself.
        if items.first().is_some_and(|first| first.id == anchor) {
            items.remove(0);
        } else if let Some(first) = items.first() {
            warn!(
                room = %room,
                cursor = %anchor,
                first = %first.id,
                "cursor message missing from history, keeping every returned item"
            );
        }

        if let Some(newest) = items.last() {
            advance(&mut slot, newest.id.clone())?;
            debug!(room = %room, count = items.len(), cursor = %newest.id, "cursor advanced");
        }

        Ok(Fetched {
            messages: items,
            telemetry: page.telemetry,
        })
    }

    async fn anchor(
        &self,
        room: &RoomId,
        slot: &mut Option<MessageId>,
    ) -> Result<Option<RateTelemetry>, RelayError> {
        let page = self
            .history_with_retry(room, &HistoryQuery::Latest { max_results: 1 })
            .await?;
        match page.items.into_iter().last() {
            Some(newest) => {
                debug!(room = %room, cursor = %newest.id, "cursor anchored");
                advance(slot, newest.id)?;
            }
            None => debug!(room = %room, "room history is empty, cursor stays unset"),
        }
        Ok(page.telemetry)
    }

    async fn history_with_retry(
        &self,
        room: &RoomId,
        query: &HistoryQuery,
    ) -> Result<HistoryPage, RelayError> {
        loop {
            match self.api.history(room, query).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() => {
                    warn!(
                        room = %room,
                        status = e.status(),
                        retry_in_ms = self.retry_delay.as_millis() as u64,
                        "history request rejected, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::CursorStore;
    use hubrelay_test_utils::{MockChatApi, message, status_error};

    fn setup() -> (Arc<MockChatApi>, HistoryFetcher, RoomCursor) {
        let api = Arc::new(MockChatApi::new());
        let fetcher = HistoryFetcher::new(api.clone(), Duration::from_secs(1));
        let store = CursorStore::new([RoomId::from("ops")]);
        let cursor = store.handle(&RoomId::from("ops")).unwrap();
        (api, fetcher, cursor)
    }

    fn ids(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.id.as_str()).collect()
    }

    #[tokio::test]
    async fn initialize_anchors_on_newest() {
        let (api, fetcher, cursor) = setup();
        api.push_history("ops", vec![message("m9", "1", "latest")]).await;

        let anchored = fetcher.initialize(&cursor).await.unwrap();
        assert_eq!(anchored, Some(MessageId::from("m9")));
        assert_eq!(
            api.history_calls_for("ops").await,
            vec![HistoryQuery::Latest { max_results: 1 }]
        );
    }

    #[tokio::test]
    async fn initialize_on_empty_room_leaves_cursor_unset() {
        let (api, fetcher, cursor) = setup();
        assert_eq!(fetcher.initialize(&cursor).await.unwrap(), None);
        assert_eq!(cursor.get().await, None);
        assert_eq!(api.history_calls_for("ops").await.len(), 1);
    }

    #[tokio::test]
    async fn unset_cursor_fetch_anchors_without_replay() {
        let (api, fetcher, cursor) = setup();
        api.push_history("ops", vec![message("m3", "1", "old news")]).await;

        let fetched = fetcher.fetch_since(&cursor).await.unwrap();
        assert!(fetched.messages.is_empty());
        assert_eq!(cursor.get().await, Some(MessageId::from("m3")));
    }

    #[tokio::test]
    async fn drops_cursor_item_and_advances() {
        let (api, fetcher, cursor) = setup();
        api.push_history("ops", vec![message("M5", "1", "five")]).await;
        fetcher.initialize(&cursor).await.unwrap();

        api.push_history(
            "ops",
            vec![
                message("M5", "1", "five"),
                message("M6", "2", "six"),
                message("M7", "3", "seven"),
            ],
        )
        .await;

        let fetched = fetcher.fetch_since(&cursor).await.unwrap();
        assert_eq!(ids(&fetched.messages), vec!["M6", "M7"]);
        assert_eq!(cursor.get().await, Some(MessageId::from("M7")));
        assert_eq!(
            api.history_calls_for("ops").await[1],
            HistoryQuery::NotBefore(MessageId::from("M5"))
        );
    }

    #[tokio::test]
    async fn only_cursor_item_means_nothing_new() {
        let (api, fetcher, cursor) = setup();
        api.push_history("ops", vec![message("M5", "1", "five")]).await;
        fetcher.initialize(&cursor).await.unwrap();
        api.push_history("ops", vec![message("M5", "1", "five")]).await;

        let fetched = fetcher.fetch_since(&cursor).await.unwrap();
        assert!(fetched.messages.is_empty());
        assert_eq!(cursor.get().await, Some(MessageId::from("M5")));
    }

    #[tokio::test]
    async fn missing_anchor_keeps_all_items() {
        let (api, fetcher, cursor) = setup();
        api.push_history("ops", vec![message("M5", "1", "five")]).await;
        fetcher.initialize(&cursor).await.unwrap();
        api.push_history(
            "ops",
            vec![message("M6", "2", "six"), message("M7", "3", "seven")],
        )
        .await;

        let fetched = fetcher.fetch_since(&cursor).await.unwrap();
        assert_eq!(ids(&fetched.messages), vec!["M6", "M7"]);
        assert_eq!(cursor.get().await, Some(MessageId::from("M7")));
    }

    #[tokio::test(start_paused = true)]
    async fn error_status_is_retried_after_delay() {
        let (api, fetcher, cursor) = setup();
        api.push_history_result("ops", Err(status_error(503))).await;
        api.push_history_result("ops", Err(status_error(429))).await;
        api.push_history("ops", vec![message("m1", "1", "hi")]).await;

        let started = tokio::time::Instant::now();
        let anchored = fetcher.initialize(&cursor).await.unwrap();
        assert_eq!(anchored, Some(MessageId::from("m1")));
        assert_eq!(api.history_calls_for("ops").await.len(), 3);
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn transport_error_is_returned() {
        let (api, fetcher, cursor) = setup();
        api.push_history_result(
            "ops",
            Err(RelayError::Transport {
                message: "connection refused".into(),
                source: None,
            }),
        )
        .await;

        let err = fetcher.initialize(&cursor).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(api.history_calls_for("ops").await.len(), 1);
    }
}
