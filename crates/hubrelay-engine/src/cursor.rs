// SPDX-FileCopyrightText: 2026 Hubrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-room cursor: the id of the newest message already delivered.
//!
//! The set of rooms is fixed at construction. Each room owns one slot behind
//! an async mutex, so a reinitialization and a fetch for the same room never
//! interleave while different rooms never contend.

use std::collections::HashMap;
use std::sync::Arc;

use hubrelay_core::error::RelayError;
use hubrelay_core::types::{MessageId, RoomId};
use tokio::sync::{Mutex, MutexGuard};

type Slot = Arc<Mutex<Option<MessageId>>>;

/// Cursors for every watched room.
#[derive(Debug, Clone, Default)]
pub struct CursorStore {
    rooms: HashMap<RoomId, Slot>,
}

impl CursorStore {
    /// Creates a store with an unset cursor for each room.
    pub fn new(rooms: impl IntoIterator<Item = RoomId>) -> Self {
        Self {
            rooms: rooms
                .into_iter()
                .map(|room| (room, Arc::new(Mutex::new(None))))
                .collect(),
        }
    }

    /// Rooms known to this store, in no particular order.
    pub fn rooms(&self) -> impl Iterator<Item = &RoomId> {
        self.rooms.keys()
    }

    /// Handle to one room's cursor, for the task that owns the room.
    pub fn handle(&self, room: &RoomId) -> Result<RoomCursor, RelayError> {
        let slot = self
            .rooms
            .get(room)
            .ok_or_else(|| RelayError::UnknownRoom(room.to_string()))?;
        Ok(RoomCursor {
            room: room.clone(),
            slot: Arc::clone(slot),
        })
    }

    pub async fn get(&self, room: &RoomId) -> Result<Option<MessageId>, RelayError> {
        Ok(self.handle(room)?.get().await)
    }

    /// Sets the cursor. Rejects empty ids; does not check ordering.
    pub async fn set(&self, room: &RoomId, id: MessageId) -> Result<(), RelayError> {
        let cursor = self.handle(room)?;
        let mut slot = cursor.lock().await;
        advance(&mut slot, id)
    }

    /// Clears the cursor so the next fetch re-anchors the room.
    pub async fn reset(&self, room: &RoomId) -> Result<(), RelayError> {
        *self.handle(room)?.lock().await = None;
        Ok(())
    }
}

/// One room's cursor slot.
#[derive(Debug, Clone)]
pub struct RoomCursor {
    room: RoomId,
    slot: Slot,
}

impl RoomCursor {
    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub async fn get(&self) -> Option<MessageId> {
        self.slot.lock().await.clone()
    }

    /// Exclusive access to the slot for the duration of one fetch.
    pub async fn lock(&self) -> MutexGuard<'_, Option<MessageId>> {
        self.slot.lock().await
    }
}

/// Moves a locked slot to `id`.
pub(crate) fn advance(slot: &mut Option<MessageId>, id: MessageId) -> Result<(), RelayError> {
    if id.as_str().is_empty() {
        return Err(RelayError::Internal("refusing to set an empty cursor".into()));
    }
    *slot = Some(id);
    Ok(())
}
